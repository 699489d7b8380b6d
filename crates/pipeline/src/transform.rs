//! Card-to-contract data transform.
//!
//! Business-specific glue mapping a fetched card's fields onto the
//! contract template's variables and signer list. The field ids and
//! template token names here are the deployment's contract layout; the
//! orchestrator only depends on the output contract
//! ([`contract_data`] -> [`template_variables`] + [`signer_list`]).

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use cardsign_core::fields::normalize_field_value;
use cardsign_core::types::{Card, Signer};

// Source field ids on the workflow card.
const FIELD_CONTACT_NAME: &str = "nome_do_contato";
const FIELD_CONTACT_EMAIL: &str = "email_profissional";
const FIELD_CONTACT_PHONE: &str = "telefone";
const FIELD_TAX_ID: &str = "cnpj";
const FIELD_SERVICES: &str = "servi_os_de_contratos";
const FIELD_TOTAL_VALUE: &str = "valor_do_neg_cio";
const FIELD_PARCEL_COUNT: &str = "quantidade_de_parcelas";

/// Vendor name used when a card has no assignee. Deliberately unmapped in
/// any sane vault-route table so generation fails loudly instead of filing
/// a contract under the wrong vault.
pub const UNASSIGNED_VENDOR: &str = "Desconhecido";

/// Flat view of the card fields the contract template consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractData {
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub tax_id: String,
    pub services: String,
    pub total_value: String,
    pub parcel_count: String,
    pub vendor: String,
}

/// Project a card's field set into [`ContractData`].
pub fn contract_data(card: &Card) -> ContractData {
    let get = |id: &str| {
        card.field_value(id)
            .map(normalize_field_value)
            .unwrap_or_default()
    };

    ContractData {
        contact_name: get(FIELD_CONTACT_NAME),
        contact_email: get(FIELD_CONTACT_EMAIL),
        contact_phone: get(FIELD_CONTACT_PHONE),
        tax_id: get(FIELD_TAX_ID),
        services: get(FIELD_SERVICES),
        total_value: get(FIELD_TOTAL_VALUE),
        parcel_count: {
            let parcels = get(FIELD_PARCEL_COUNT);
            if parcels.is_empty() {
                "1".to_string()
            } else {
                parcels
            }
        },
        vendor: card
            .primary_assignee()
            .unwrap_or(UNASSIGNED_VENDOR)
            .to_string(),
    }
}

/// Render the flat template-token map for document creation.
pub fn template_variables(data: &ContractData) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    vars.insert("Contratante 1".to_string(), data.contact_name.clone());
    vars.insert(
        "Dados para contato".to_string(),
        format!("{} / {}", data.contact_email, data.contact_phone),
    );
    vars.insert("CNPJ/CPF".to_string(), data.tax_id.clone());
    vars.insert("Serviços contratados".to_string(), data.services.clone());
    vars.insert("Valor da Assessoria".to_string(), data.total_value.clone());
    vars.insert(
        "Número de parcelas da Assessoria".to_string(),
        data.parcel_count.clone(),
    );
    vars.insert(
        "Valor da parcela".to_string(),
        per_parcel_value(&data.total_value, &data.parcel_count)
            .unwrap_or_else(|| data.total_value.clone()),
    );
    vars.insert("Vendedor".to_string(), data.vendor.clone());
    vars
}

/// The contact signs the contract; the defaults from [`Signer::new`] cover
/// the remaining descriptor fields.
pub fn signer_list(data: &ContractData) -> Vec<Signer> {
    vec![Signer::new(&data.contact_email, &data.contact_name)]
}

/// Divide the total by the parcel count, both in `1.234,56` notation.
///
/// Returns `None` when either side fails to parse; the caller falls back
/// to the raw total rather than writing a bogus number into a contract.
pub fn per_parcel_value(total: &str, parcels: &str) -> Option<String> {
    let total = parse_amount(total)?;
    let count: u32 = parcels.trim().parse().ok().filter(|c| *c > 0)?;
    let per_parcel = (total / Decimal::from(count)).round_dp(2);
    Some(format_amount(per_parcel))
}

/// Parse a Brazilian-format currency string (`R$ 1.234,56`) into a decimal.
fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse().ok()
}

/// Format a decimal back into `1.234,56` notation with two places.
fn format_amount(value: Decimal) -> String {
    let fixed = format!("{:.2}", value);
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    format!("{sign}{grouped},{frac_part}")
}
