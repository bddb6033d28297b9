pub mod brands;
pub mod categories;
pub mod contact;
pub mod news;
pub mod products;
pub mod session;
pub mod upload;
