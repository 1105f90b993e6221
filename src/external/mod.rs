pub mod market_provider;
pub mod mock;
pub mod serper;
pub mod tiingo;
pub mod yahoo;
