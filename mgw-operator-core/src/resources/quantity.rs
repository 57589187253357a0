use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use once_cell::sync::Lazy;
use regex::Regex;

// <sign><number><suffix>, suffix being binary SI, decimal SI or a decimal exponent
static QUANTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?([0-9]+(\.[0-9]*)?|\.[0-9]+)(Ki|Mi|Gi|Ti|Pi|Ei|n|u|m|k|M|G|T|P|E|[eE][+-]?[0-9]+)?$")
        .expect("quantity regex must compile")
});

pub fn is_valid_quantity(raw: &str) -> bool {
    QUANTITY_REGEX.is_match(raw)
}

/// Parses a resource quantity, rejecting anything the API server wouldn't accept.
pub fn parse_quantity(raw: &str) -> Option<Quantity> {
    let trimmed = raw.trim();

    is_valid_quantity(trimmed).then(|| Quantity(trimmed.to_owned()))
}
