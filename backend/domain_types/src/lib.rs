pub mod connector_flow;
pub mod connector_types;
pub mod errors;
pub mod payment;
pub mod request;
pub mod router_data;
pub mod types;
pub mod utils;
