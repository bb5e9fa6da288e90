pub mod ledger;
pub mod payment_gateway;
pub mod provision_service;
pub mod refund_service;

#[cfg(test)]
pub(crate) mod test_support;
