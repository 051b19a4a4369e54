pub mod awesomeapi;
pub mod quote_provider;
