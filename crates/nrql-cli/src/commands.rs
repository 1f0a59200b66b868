use anyhow::Result;
use colored::Colorize;
use nrql_cache::query_cache_key;
use nrql_core::{Settings, ValidationError};
use nrql_validator::{NrqlValidator, ValidatorConfig};

pub fn validator_from(settings: &Settings) -> NrqlValidator {
    NrqlValidator::new(ValidatorConfig::from(&settings.validator))
}

/// Turn a rejection into an error that carries its stable code
pub fn rejected(err: ValidationError) -> anyhow::Error {
    anyhow::anyhow!("{} [{}]", err, err.code())
}

pub fn sanitize_query(settings: &Settings, query: &str, show_key: bool) -> Result<()> {
    let validator = validator_from(settings);
    let sanitized = validator.sanitize(query).map_err(rejected)?;

    println!("{} Query accepted", "✓".bright_green());
    println!("{}", sanitized);

    if show_key {
        println!(
            "{} {}",
            "Cache key:".bright_yellow(),
            query_cache_key(&sanitized, &[])
        );
    }

    Ok(())
}

pub fn check_identifier(settings: &Settings, name: &str) -> Result<()> {
    let validator = validator_from(settings);
    let identifier = validator.sanitize_identifier(name).map_err(rejected)?;

    println!("{} Identifier accepted", "✓".bright_green());
    println!("{}", identifier);
    Ok(())
}

pub fn escape_value(settings: &Settings, value: &str) {
    let validator = validator_from(settings);
    println!("'{}'", validator.sanitize_string_value(value));
}

pub fn check_time_range(settings: &Settings, range: &str) -> Result<()> {
    let validator = validator_from(settings);
    let kind = validator.validate_time_range(range).map_err(rejected)?;

    println!(
        "{} Time range accepted ({})",
        "✓".bright_green(),
        kind.to_string().bright_cyan()
    );
    Ok(())
}

pub fn list_event_types(settings: &Settings, query: &str) -> Result<()> {
    let validator = validator_from(settings);
    let event_types = validator.extract_event_types(query).map_err(rejected)?;

    println!(
        "{} {} event type(s)",
        "✓".bright_green(),
        event_types.len()
    );
    for event_type in event_types {
        println!("  {}", event_type.bright_cyan());
    }
    Ok(())
}

pub fn show_settings(settings: &Settings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}
