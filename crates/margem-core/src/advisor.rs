//! # Pricing Advisor
//!
//! Reads a finished margin table and turns it into short operator tips.
//! Works over any row type implementing [`MarginRow`], so both the quick
//! preview and the full summary can be advised.
//!
//! ```text
//! rows ──► losses (margin < 0)          ──► "Produtos no prejuízo: …"
//!      ──► low margin (< 15%)           ──► "Margem abaixo de 15% em: …"
//!      ──► top 3 by margin %            ──► "Destaque em anúncios e combos: …"
//!      ──► no loss / low-margin tip     ──► "Estrutura saudável. …"
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::pricing::PricingResultRow;
use crate::quick::QuickPriceRow;
use crate::{ADVICE_HIGHLIGHT_LIMIT, ADVICE_LIST_LIMIT, LOW_MARGIN_THRESHOLD_BPS};

const TIP_SEPARATOR: &str = " • ";
const EMPTY_TABLE_PROMPT: &str =
    "Cadastre insumos, monte a composição e informe preço de venda para receber recomendações.";

/// A table row the advisor can reason about.
pub trait MarginRow {
    fn product(&self) -> &str;
    /// Net margin in reais.
    fn margin_amount(&self) -> Decimal;
    /// Net margin as a fraction of the listed price.
    fn margin_pct(&self) -> Decimal;
}

impl MarginRow for QuickPriceRow {
    fn product(&self) -> &str {
        &self.product
    }

    fn margin_amount(&self) -> Decimal {
        self.net_margin.amount()
    }

    fn margin_pct(&self) -> Decimal {
        self.net_margin_pct
    }
}

/// Summary rows are judged on the with-discount margin: that is what the
/// seller actually keeps.
impl MarginRow for PricingResultRow {
    fn product(&self) -> &str {
        &self.product
    }

    fn margin_amount(&self) -> Decimal {
        self.net_margin_amount_with_discount.amount()
    }

    fn margin_pct(&self) -> Decimal {
        self.net_margin_pct_with_discount
    }
}

// =============================================================================
// Tips
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Tip {
    Losses { products: Vec<String> },
    LowMargin { products: Vec<String> },
    Highlight { products: Vec<String> },
    Healthy,
}

impl fmt::Display for Tip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tip::Losses { products } => write!(
                f,
                "Produtos no prejuízo: {}. Revise preço, taxa aplicada e gramagens.",
                products.join(", ")
            ),
            Tip::LowMargin { products } => write!(
                f,
                "Margem abaixo de 15% em: {}. Avalie reajuste de preço ou reengenharia de ficha técnica.",
                products.join(", ")
            ),
            Tip::Highlight { products } => write!(
                f,
                "Destaque em anúncios e combos: {} (maiores margens).",
                products.join(", ")
            ),
            Tip::Healthy => write!(
                f,
                "Estrutura saudável. Siga monitorando incentivos, ticket e custos fixos mensais."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Advice {
    pub tips: Vec<Tip>,
    /// All tips as one line, or the onboarding prompt for an empty table.
    pub summary: String,
}

/// Builds tips for a margin table, in the table's own row order.
pub fn advise<R: MarginRow>(rows: &[R]) -> Advice {
    if rows.is_empty() {
        return Advice {
            tips: Vec::new(),
            summary: EMPTY_TABLE_PROMPT.to_string(),
        };
    }

    let low_margin = Decimal::new(i64::from(LOW_MARGIN_THRESHOLD_BPS), 4);
    let mut tips = Vec::new();

    let losses = names_where(rows, |r| r.margin_amount() < Decimal::ZERO);
    if !losses.is_empty() {
        tips.push(Tip::Losses { products: losses });
    }

    let low = names_where(rows, |r| r.margin_pct() < low_margin);
    if !low.is_empty() {
        tips.push(Tip::LowMargin { products: low });
    }
    let needs_attention = !tips.is_empty();

    let mut ranked: Vec<&R> = rows.iter().collect();
    ranked.sort_by(|a, b| {
        b.margin_pct()
            .cmp(&a.margin_pct())
            .then_with(|| a.product().cmp(b.product()))
    });
    tips.push(Tip::Highlight {
        products: ranked
            .into_iter()
            .take(ADVICE_HIGHLIGHT_LIMIT)
            .map(|r| r.product().to_string())
            .collect(),
    });

    if !needs_attention {
        tips.push(Tip::Healthy);
    }

    let summary = tips
        .iter()
        .map(Tip::to_string)
        .collect::<Vec<_>>()
        .join(TIP_SEPARATOR);
    Advice { tips, summary }
}

fn names_where<R: MarginRow>(rows: &[R], predicate: impl Fn(&R) -> bool) -> Vec<String> {
    rows.iter()
        .filter(|r| predicate(r))
        .take(ADVICE_LIST_LIMIT)
        .map(|r| r.product().to_string())
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
