pub(crate) mod auth;
pub(crate) mod health;
pub(crate) mod market;
pub(crate) mod portfolio;
pub(crate) mod stocks;
pub(crate) mod user;
pub(crate) mod watchlist;
