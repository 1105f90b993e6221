mod auth;
mod market;
mod market_report;
mod portfolio;
mod stock;
mod user;
mod watchlist;

pub use auth::{Claims, GoogleIdentity, GoogleLoginRequest, LoginForm, TokenResponse};
pub use market::{
    DividendFrequency, DividendInfo, DividendPayment, ExchangeRate, FullStockData,
    MarketBriefData, MarketDashboard, NewsItem, PriceQuote, SecLink, StockProfile,
};
pub use market_report::{DayPart, MarketBriefResponse, MarketReport};
pub use portfolio::{
    weighted_average, AddPortfolioItem, DividendProjection, HoldingDividendProjection,
    MonthlyIncome, PortfolioAdvice, PortfolioItem, PortfolioItemResponse, ProjectedPayment,
    RemovedItem,
};
pub use stock::{CreateStock, Stock, StockAnalysis};
pub use user::{
    CreateUser, InvestorProfile, RiskTolerance, UpdateUserProfile, User, UserProfileResponse,
    UserResponse,
};
pub use watchlist::{AddWatchlistItem, WatchlistEntry, WatchlistEntryResponse, WatchlistItem};
