//! Currency conversion backed by a remote rate service.

use crate::core::currency::{CurrencyList, CurrencyRateProvider, Quote};
use crate::core::error::LookupError;
use crate::core::lookup::{Completion, LookupSlot, LookupState, LookupWatcher};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

/// When a change of currency codes should fetch a new rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPolicy {
    /// Only an explicit submit fetches a rate.
    #[default]
    OnSubmit,
    /// Changing either code fetches a rate straight away.
    OnChange,
}

/// A fetched quote applied to the amount the user asked about.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub quote: Quote,
}

impl Conversion {
    /// Unrounded converted amount.
    pub fn converted(&self) -> f64 {
        self.amount * self.quote.rate
    }

    pub fn converted_display(&self) -> String {
        format!("{:.2}", round_to(self.converted(), 2))
    }

    /// The amount as typed: at most six decimals, no trailing zeros.
    pub fn amount_display(&self) -> String {
        let fixed = format!("{:.6}", round_to(self.amount, 6));
        fixed
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }

    pub fn unit_rate_display(&self) -> String {
        format!("{:.6}", round_to(self.quote.rate, 6))
    }

    /// "100 USD = 1500000.00 IDR"
    pub fn summary_line(&self) -> String {
        format!(
            "{} {} = {} {}",
            self.amount_display(),
            self.quote.base_code,
            self.converted_display(),
            self.quote.quote_code
        )
    }

    /// "1 USD = 15000.000000 IDR"
    pub fn unit_line(&self) -> String {
        format!(
            "1 {} = {} {}",
            self.quote.base_code,
            self.unit_rate_display(),
            self.quote.quote_code
        )
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug, Clone)]
struct PendingConversion {
    amount: f64,
    from: String,
    to: String,
}

pub struct RateLookup {
    provider: Arc<dyn CurrencyRateProvider>,
    policy: TriggerPolicy,
    input: Mutex<PendingConversion>,
    conversion: LookupSlot<Conversion>,
    currencies: LookupSlot<CurrencyList>,
}

impl RateLookup {
    pub fn new(provider: Arc<dyn CurrencyRateProvider>, policy: TriggerPolicy) -> Self {
        Self {
            provider,
            policy,
            input: Mutex::new(PendingConversion {
                amount: 1.0,
                from: "USD".to_string(),
                to: "IDR".to_string(),
            }),
            conversion: LookupSlot::new(),
            currencies: LookupSlot::new(),
        }
    }

    pub fn policy(&self) -> TriggerPolicy {
        self.policy
    }

    pub fn state(&self) -> LookupState<Conversion> {
        self.conversion.state()
    }

    pub fn subscribe(&self) -> LookupWatcher<Conversion> {
        self.conversion.subscribe()
    }

    pub fn currencies(&self) -> LookupState<CurrencyList> {
        self.currencies.state()
    }

    /// Fetches the list of codes convertible from `base`.
    #[instrument(skip(self))]
    pub async fn load_currencies(&self, base: &str) -> Completion {
        let token = self.currencies.begin();
        let outcome = self.provider.supported_codes(&normalize_code(base)).await;
        self.currencies.complete(token, outcome)
    }

    pub fn set_amount(&self, amount: f64) {
        self.input.lock().unwrap_or_else(|e| e.into_inner()).amount = amount;
    }

    /// Records new codes. Under [`TriggerPolicy::OnChange`] this also runs a
    /// conversion and returns its completion.
    pub async fn set_codes(&self, from: &str, to: &str) -> Option<Completion> {
        {
            let mut input = self.input.lock().unwrap_or_else(|e| e.into_inner());
            input.from = normalize_code(from);
            input.to = normalize_code(to);
        }
        match self.policy {
            TriggerPolicy::OnSubmit => None,
            TriggerPolicy::OnChange => Some(self.submit().await),
        }
    }

    /// Converts using the most recently recorded amount and codes.
    pub async fn submit(&self) -> Completion {
        let input = self.input.lock().unwrap_or_else(|e| e.into_inner()).clone();
        self.convert(input.amount, &input.from, &input.to).await
    }

    /// Fetches the rate for `from` → `to` and publishes the conversion of `amount`.
    #[instrument(skip(self))]
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> Completion {
        let from = normalize_code(from);
        let to = normalize_code(to);
        {
            let mut input = self.input.lock().unwrap_or_else(|e| e.into_inner());
            *input = PendingConversion {
                amount,
                from: from.clone(),
                to: to.clone(),
            };
        }

        let token = self.conversion.begin();
        if let Err(err) = self.validate(amount, &from, &to) {
            return self.conversion.complete(token, Err(err));
        }

        debug!("Requesting quote");
        let outcome = self
            .provider
            .get_quote(&from, &to)
            .await
            .map(|quote| Conversion { amount, quote });
        self.conversion.complete(token, outcome)
    }

    fn validate(&self, amount: f64, from: &str, to: &str) -> Result<(), LookupError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(LookupError::InvalidInput(format!(
                "amount must be a non-negative number, got {amount}"
            )));
        }
        if from.is_empty() || to.is_empty() {
            return Err(LookupError::InvalidInput(
                "both currency codes are required".to_string(),
            ));
        }
        // Only checked once the supported list has been loaded.
        if let LookupState::Success(list) = self.currencies.state() {
            for code in [from, to] {
                if !list.contains(code) {
                    return Err(LookupError::UnknownIdentifier(code.to_string()));
                }
            }
        }
        Ok(())
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}
