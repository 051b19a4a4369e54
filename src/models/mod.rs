mod quotation;

pub use quotation::{Quotation, QuotationRecord, QuoteEnvelope};
