//! # Application Configuration
//!
//! The key-value store the engine's caller reads its scalars from.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MARGEM_DELIVERY_MODE=marketplace                                   │
//! │     MARGEM_TAX_RATE=0.06                                               │
//! │                                                                         │
//! │  2. Config File (JSON, or TOML when the path ends in .toml)            │
//! │     ~/.config/margem/config.json (Linux)                               │
//! │     ~/Library/Application Support/br.margem.margem/config.json (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     self delivery, no tax, 20% target margin                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # config.toml
//! [delivery]
//! mode = "marketplace_logistics"   # self_delivery | marketplace_logistics
//! self_delivery_unit_cost = "0"
//!
//! [costs]
//! tax_rate = "0.06"
//! packaging_unit_cost = "0.80"
//! default_target_margin = "0.20"
//!
//! [costs.fixed_costs]
//! rent = "2500"
//! payroll = "4200"
//!
//! [quick]
//! commission = "0.23"
//!
//! [engine]
//! missing_ingredient_policy = "zero_cost"   # zero_cost | reject
//! ```

use margem_core::bom::{BillOfMaterials, IngredientCatalog};
use margem_core::delivery::{DeliveryConfig, DeliveryMode};
use margem_core::money::Money;
use margem_core::pricing::PricingRequest;
use margem_core::types::{FixedCostPool, MissingIngredientPolicy, ProductPricing, Rate};
use margem_core::validation::{validate_non_negative, validate_rate};
use margem_core::QUICK_DEFAULT_COMMISSION_BPS;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// Target margin used when neither the file nor the product sets one (20%).
const DEFAULT_TARGET_MARGIN_BPS: u32 = 2000;

// =============================================================================
// File Format
// =============================================================================

/// On-disk encoding, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

// =============================================================================
// Sections
// =============================================================================

/// Who delivers and what it costs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeliverySettings {
    #[serde(default)]
    pub mode: DeliveryMode,

    /// Average cost of one self-delivered order.
    #[serde(default)]
    pub self_delivery_unit_cost: Money,

    /// Replaces the commission derived from `mode`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission_override: Option<Rate>,
}

impl DeliverySettings {
    pub fn delivery_config(&self) -> DeliveryConfig {
        let config = DeliveryConfig::new(self.mode, self.self_delivery_unit_cost);
        match self.commission_override {
            Some(commission) => config.with_commission(commission),
            None => config,
        }
    }
}

/// Global cost scalars and the monthly fixed-cost pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostSettings {
    #[serde(default)]
    pub tax_rate: Rate,

    #[serde(default)]
    pub packaging_unit_cost: Money,

    #[serde(default = "default_target_margin")]
    pub default_target_margin: Rate,

    #[serde(default)]
    pub fixed_costs: FixedCostPool,
}

fn default_target_margin() -> Rate {
    Rate::from_bps(DEFAULT_TARGET_MARGIN_BPS)
}

impl Default for CostSettings {
    fn default() -> Self {
        CostSettings {
            tax_rate: Rate::zero(),
            packaging_unit_cost: Money::zero(),
            default_target_margin: default_target_margin(),
            fixed_costs: FixedCostPool::new(),
        }
    }
}

/// Settings of the single-commission preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickSettings {
    #[serde(default = "default_quick_commission")]
    pub commission: Rate,
}

fn default_quick_commission() -> Rate {
    Rate::from_bps(QUICK_DEFAULT_COMMISSION_BPS)
}

impl Default for QuickSettings {
    fn default() -> Self {
        QuickSettings {
            commission: default_quick_commission(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub missing_ingredient_policy: MissingIngredientPolicy,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete application configuration.
///
/// ## Example Config File
/// ```json
/// {
///   "delivery": { "mode": "self_delivery", "self_delivery_unit_cost": "6.50" },
///   "costs": {
///     "tax_rate": "0.06",
///     "packaging_unit_cost": "0.80",
///     "default_target_margin": "0.25",
///     "fixed_costs": { "rent": "2500", "power": "640" }
///   },
///   "quick": { "commission": "0.23" },
///   "engine": { "missing_ingredient_policy": "reject" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub delivery: DeliverySettings,

    #[serde(default)]
    pub costs: CostSettings,

    #[serde(default)]
    pub quick: QuickSettings,

    #[serde(default)]
    pub engine: EngineSettings,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> StoreResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::read_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Reads one file without environment overrides or validation.
    pub fn read_file(path: &Path) -> StoreResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        match ConfigFormat::from_path(path) {
            ConfigFormat::Toml => Ok(toml::from_str(&contents)?),
            ConfigFormat::Json => serde_json::from_str(&contents)
                .map_err(|e| StoreError::ConfigLoadFailed(e.to_string())),
        }
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> StoreResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| StoreError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = match ConfigFormat::from_path(&path) {
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
        };
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> StoreResult<()> {
        validate_rate("costs.tax_rate", self.costs.tax_rate)?;
        validate_rate("costs.default_target_margin", self.costs.default_target_margin)?;
        validate_rate("quick.commission", self.quick.commission)?;
        validate_non_negative("costs.packaging_unit_cost", self.costs.packaging_unit_cost)?;
        validate_non_negative(
            "delivery.self_delivery_unit_cost",
            self.delivery.self_delivery_unit_cost,
        )?;
        if let Some(commission) = self.delivery.commission_override {
            validate_rate("delivery.commission_override", commission)?;
        }
        for (category, amount) in self.costs.fixed_costs.iter() {
            if amount.is_negative() {
                return Err(StoreError::InvalidConfig(format!(
                    "fixed cost '{}' must not be negative",
                    category
                )));
            }
        }
        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparsable values are logged
    /// and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(mode) = lookup("MARGEM_DELIVERY_MODE") {
            match mode.parse::<DeliveryMode>() {
                Ok(parsed) => {
                    debug!(mode = %parsed, "Overriding delivery mode from environment");
                    self.delivery.mode = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown delivery mode in environment"),
            }
        }

        if let Some(cost) = lookup("MARGEM_SELF_DELIVERY_COST") {
            if let Some(value) = parse_env_decimal("MARGEM_SELF_DELIVERY_COST", &cost) {
                self.delivery.self_delivery_unit_cost = Money::new(value);
            }
        }

        if let Some(rate) = lookup("MARGEM_TAX_RATE") {
            if let Some(value) = parse_env_decimal("MARGEM_TAX_RATE", &rate) {
                self.costs.tax_rate = Rate::from_fraction(value);
            }
        }

        if let Some(cost) = lookup("MARGEM_PACKAGING_COST") {
            if let Some(value) = parse_env_decimal("MARGEM_PACKAGING_COST", &cost) {
                self.costs.packaging_unit_cost = Money::new(value);
            }
        }

        if let Some(rate) = lookup("MARGEM_TARGET_MARGIN") {
            if let Some(value) = parse_env_decimal("MARGEM_TARGET_MARGIN", &rate) {
                self.costs.default_target_margin = Rate::from_fraction(value);
            }
        }

        if let Some(policy) = lookup("MARGEM_MISSING_INGREDIENT_POLICY") {
            match policy.parse::<MissingIngredientPolicy>() {
                Ok(parsed) => self.engine.missing_ingredient_policy = parsed,
                Err(_) => {
                    warn!(policy = %policy, "Unknown missing-ingredient policy in environment")
                }
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("br", "margem", "margem")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    // =========================================================================
    // Engine Inputs
    // =========================================================================

    /// Assembles a pricing request from this configuration and the loaded
    /// tables. The engine never reads the configuration itself.
    pub fn pricing_request(
        &self,
        catalog: IngredientCatalog,
        bom: BillOfMaterials,
        products: Vec<ProductPricing>,
    ) -> PricingRequest {
        PricingRequest::new(catalog, bom, products)
            .with_fixed_costs(self.costs.fixed_costs.clone())
            .with_tax_rate(self.costs.tax_rate)
            .with_packaging_unit_cost(self.costs.packaging_unit_cost)
            .with_delivery(self.delivery.delivery_config())
            .with_default_target_margin(self.costs.default_target_margin)
            .with_missing_ingredient_policy(self.engine.missing_ingredient_policy)
    }

    /// Returns the delivery mode.
    pub fn mode(&self) -> DeliveryMode {
        self.delivery.mode
    }
}

fn parse_env_decimal(key: &str, raw: &str) -> Option<Decimal> {
    match Decimal::from_str(raw.trim()) {
        Ok(value) => {
            debug!(key, %value, "Overriding value from environment");
            Some(value)
        }
        Err(_) => {
            warn!(key, raw, "Ignoring unparsable number in environment");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use margem_core::types::FixedCostCategory;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("margem-config-test-{}", std::process::id()))
            .join(name)
    }

    fn sample() -> AppConfig {
        let mut config = AppConfig::default();
        config.delivery.mode = DeliveryMode::MarketplaceLogistics;
        config.costs.tax_rate = Rate::from_bps(600);
        config.costs.packaging_unit_cost = Money::new(dec!(0.80));
        config.costs.fixed_costs = FixedCostPool::new()
            .with(FixedCostCategory::Rent, Money::from_reais(2500))
            .with(FixedCostCategory::Payroll, Money::from_reais(4200));
        config.engine.missing_ingredient_policy = MissingIngredientPolicy::Reject;
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mode(), DeliveryMode::SelfDelivery);
        assert_eq!(config.quick.commission, Rate::from_bps(2300));
        assert_eq!(config.costs.default_target_margin, Rate::from_bps(2000));
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.costs.tax_rate = Rate::from_fraction(dec!(1.2));
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.delivery.commission_override = Some(Rate::from_fraction(dec!(2)));
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.costs.packaging_unit_cost = Money::from_cents(-10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("MARGEM_DELIVERY_MODE", "ifood"),
            ("MARGEM_TAX_RATE", "0.08"),
            ("MARGEM_SELF_DELIVERY_COST", "7.5"),
            ("MARGEM_TARGET_MARGIN", "not-a-number"),
            ("MARGEM_MISSING_INGREDIENT_POLICY", "strict"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.delivery.mode, DeliveryMode::MarketplaceLogistics);
        assert_eq!(config.costs.tax_rate, Rate::from_bps(800));
        assert_eq!(config.delivery.self_delivery_unit_cost, Money::new(dec!(7.5)));
        assert_eq!(config.costs.default_target_margin, Rate::from_bps(2000));
        assert_eq!(
            config.engine.missing_ingredient_policy,
            MissingIngredientPolicy::Reject
        );
    }

    #[test]
    fn test_json_save_and_load() {
        let path = temp_path("config.json");
        let config = sample();
        config.save(Some(path.clone())).unwrap();

        let loaded = AppConfig::read_file(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_toml_save_and_load() {
        let path = temp_path("config.toml");
        let mut config = sample();
        config.delivery.commission_override = Some(Rate::from_bps(3000));
        config.save(Some(path.clone())).unwrap();

        let loaded = AppConfig::read_file(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let toml_str = r#"
            [delivery]
            mode = "marketplace_logistics"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mode(), DeliveryMode::MarketplaceLogistics);
        assert_eq!(config.quick, QuickSettings::default());
        assert_eq!(config.costs.default_target_margin, Rate::from_bps(2000));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a/config.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a/config.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a/config")), ConfigFormat::Json);
    }

    #[test]
    fn test_pricing_request_carries_settings() {
        let mut config = sample();
        config.delivery.commission_override = Some(Rate::from_bps(3000));
        let request = config.pricing_request(
            IngredientCatalog::new(),
            BillOfMaterials::new(),
            Vec::new(),
        );

        assert_eq!(request.tax_rate, Rate::from_bps(600));
        assert_eq!(request.delivery.commission, Rate::from_bps(3000));
        assert_eq!(request.fixed_costs.total(), Money::from_reais(6700));
        assert_eq!(
            request.missing_ingredient_policy,
            MissingIngredientPolicy::Reject
        );
    }
}
