use crate::error::{ensure_written, BillingResult, WriteOperation};
use crate::fanout::run_to_completion;
use crate::messages::{MessageLog, MessageSender};
use crate::service::BillingContext;
use crate::settings::{self, CustomerSettings};
use accounting_service::{Customer, CustomerPatch, ShippingDetails};
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct DefaultsReport {
    /// Customers whose settings were written
    pub updated: Vec<Customer>,
    pub messages: Vec<String>,
}

/// Makes sure every active customer carries a complete settings blob
pub struct CustomerDefaultsInitializer {
    ctx: BillingContext,
}

impl CustomerDefaultsInitializer {
    pub fn new(ctx: BillingContext) -> Self {
        Self { ctx }
    }

    pub async fn apply_defaults(&self) -> BillingResult<DefaultsReport> {
        let config = &self.ctx.config;
        let customers: Vec<Customer> = self
            .ctx
            .api
            .list_customers()
            .await?
            .into_iter()
            .filter(|customer| {
                customer.active
                    && !customer.name.starts_with(&config.excluded_name_prefix)
                    && !customer.name.starts_with(&config.unconfigured_name_prefix)
            })
            .collect();

        let log = MessageLog::new();
        let updated: Vec<Option<Customer>> = run_to_completion(customers, config.max_concurrency, |customer| {
            self.apply_to(customer, log.sender())
        })
        .await?;

        let mut report = DefaultsReport {
            updated: updated.into_iter().flatten().collect(),
            messages: log.drain(),
        };
        report.updated.sort_by_key(|customer| customer.id);

        info!(updated = report.updated.len(), "Customer defaults applied");
        Ok(report)
    }

    async fn apply_to(&self, customer: Customer, messages: MessageSender) -> BillingResult<Option<Customer>> {
        let today = self.ctx.today();
        let defaults = &self.ctx.config.settings_defaults;

        match settings::decode(&customer) {
            None => {
                let fresh = CustomerSettings::from_defaults(defaults, today);
                let patch = CustomerPatch {
                    shipping_details: ShippingDetails {
                        ship_to_contact: Some(customer.name.clone()),
                        delivery_instructions: Some(settings::encode(&fresh)?),
                        phone_number: Some(String::new()),
                        address1: Some(String::new()),
                        address2: Some(String::new()),
                        city: Some(String::new()),
                        postal_code: Some(String::new()),
                    },
                };
                let response = ensure_written(
                    WriteOperation::SaveSettings,
                    &customer.url,
                    self.ctx.api.update_customer(&customer.url, &patch).await,
                )?;

                info!(customer = %customer.name, "Created default settings");
                messages.push(format!("Creating new defaults for customer: {}", customer.name));
                Ok(Some(response.payload.unwrap_or(Customer {
                    shipping_details: Some(patch.shipping_details),
                    ..customer
                })))
            }
            Some(current) => {
                let merged = settings::merge_defaults(&current, defaults, today);
                if !merged.changed {
                    debug!(customer = %customer.name, "Settings complete");
                    return Ok(None);
                }
                for change in &merged.changes {
                    messages.push(format!("{} for customer: {}", change, customer.name));
                }
                let saved = settings::save_updated(self.ctx.api.as_ref(), &customer, &merged.settings).await?;
                Ok(Some(saved))
            }
        }
    }
}
