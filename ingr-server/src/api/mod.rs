//! HTTP API handlers for ingr-server

pub mod classes;
pub mod datasets;
pub mod health;
pub mod images;
pub mod labels;
pub mod plugins;
pub mod projects;
pub mod uploads;

pub use classes::class_routes;
pub use datasets::dataset_routes;
pub use health::health_routes;
pub use images::image_routes;
pub use labels::label_routes;
pub use plugins::plugin_routes;
pub use projects::project_routes;
pub use uploads::upload_routes;

/// Values of a repeated query parameter (`name` or `name[]`), blanks dropped
pub(crate) fn query_values(params: &[(String, String)], name: &str) -> Vec<String> {
    let bracketed = format!("{}[]", name);
    params
        .iter()
        .filter(|(key, _)| key == name || *key == bracketed)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_values_collects_repeats() {
        let params = vec![
            ("dataset_ids".to_string(), "a".to_string()),
            ("other".to_string(), "x".to_string()),
            ("dataset_ids[]".to_string(), "b".to_string()),
            ("dataset_ids".to_string(), "".to_string()),
        ];
        assert_eq!(query_values(&params, "dataset_ids"), vec!["a", "b"]);
    }
}
