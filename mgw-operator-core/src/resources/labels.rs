use std::collections::BTreeMap;

pub const APP_LABEL: &str = "app";

pub fn get_api_labels(api_name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_owned(), api_name.to_owned())])
}
