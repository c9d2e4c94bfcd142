use domain_types::{
    connector_flow::Verify,
    connector_types::{ConnectorEnum, PaymentsVerifyData, VerifyResponseData},
};
use interfaces::api::BoxedConnectorIntegration;

use crate::connectors::Paystack;

#[derive(Clone)]
pub struct ConnectorData {
    pub connector_name: ConnectorEnum,
}

impl ConnectorData {
    pub fn get_connector_by_name(connector_name: &ConnectorEnum) -> Self {
        Self {
            connector_name: connector_name.clone(),
        }
    }

    pub fn verify_integration(
        &self,
    ) -> BoxedConnectorIntegration<'static, Verify, PaymentsVerifyData, VerifyResponseData> {
        match self.connector_name {
            ConnectorEnum::Paystack => Box::new(Paystack::new()),
        }
    }
}
