//! Domain types for the prediction marketplace.

pub mod analyst;
pub mod bar;
pub mod horizon;
pub mod prediction;
pub mod symbol;

pub use analyst::{Analyst, NewAnalyst};
pub use bar::PriceBar;
pub use horizon::{Horizon, ParseHorizonError};
pub use prediction::{Forecast, NewPrediction, Prediction, PredictionValidationError};
pub use symbol::{IngestStatus, Symbol, SymbolSeed};
