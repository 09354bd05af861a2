//! Business logic services for the Stock Ledger

pub mod account;
pub mod notification;
pub mod stock_line;
pub mod stock_take;
pub mod user;
pub mod warehouse;

pub use account::AccountService;
pub use notification::NotificationService;
pub use stock_line::StockLineService;
pub use stock_take::{StockTakeOutcome, StockTakeService};
pub use user::UserService;
pub use warehouse::WarehouseService;
