pub mod plan;
pub mod tariff;
