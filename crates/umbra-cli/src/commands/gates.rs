//! Version gate table command.

use umbra::{ApiLevel, ConfigField};

/// Prints every configuration field with the API level that introduced it.
pub fn run(api_level: Option<u16>) {
    let api_level = api_level.map(ApiLevel::new);

    println!("{:<26} {:>9}", "FIELD", "MIN API");
    for field in ConfigField::ALL {
        let min = field.min_api_level();
        match api_level {
            Some(level) => {
                let status = if field.applies_at(level) { "applied" } else { "gated" };
                println!("{:<26} {:>9}  {status}", field.name(), min.to_string());
            }
            None => println!("{:<26} {:>9}", field.name(), min.to_string()),
        }
    }
}
