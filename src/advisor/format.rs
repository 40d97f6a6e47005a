//! Prompt construction and best-effort cleanup of the model's reply.
//!
//! The reply is plain prose with loosely numbered sections. The summary
//! scanner keys off the literal section headings requested in the prompt, so
//! those strings must stay in sync with [`build_prompt`].

use super::SoilSnapshot;
use crate::severity::{HUMIDITY, MOISTURE, PH, TEMPERATURE};

/// Lower-cased heading that starts the action list.
pub const ACTIONS_HEADING: &str = "2. specific maize farming actions";
/// Prefix of the heading that ends the action list.
pub const WARNINGS_PREFIX: &str = "3. ";

const NO_ACTIONS_LINE: &str = "- No specific actions extracted. Please verify formatting.";

/// Applied in order; later patterns see the output of earlier ones.
const MARKUP_REPLACEMENTS: [(&str, &str); 5] = [
    ("**", ""),
    ("### ", "\n\n"),
    ("## ", "\n\n"),
    ("# ", "\n\n"),
    ("- ", "\n- "),
];

pub fn build_prompt(snapshot: &SoilSnapshot) -> String {
    let value = |v: Option<f64>| v.map_or_else(|| "unknown".to_owned(), |v| v.to_string());
    let timestamp = snapshot
        .timestamp
        .map_or_else(|| "unknown".to_owned(), |t| t.to_rfc3339());

    format!(
        "You are an agricultural advisor specializing in maize (corn) farming. \
         Analyze the following soil data and provide recommendations based on \
         optimal conditions for maize:\n\
         \n\
         - Soil Moisture: {moisture}%\n\
         - Soil Temperature: {temperature}°C\n\
         - Soil Humidity: {humidity}%\n\
         - Soil pH: {ph}\n\
         - Timestamp: {timestamp}\n\
         \n\
         Ideal maize conditions:\n\
         - Moisture: {:.0}% to {:.0}%\n\
         - pH: {:.1} to {:.1}\n\
         - Temperature: {:.0}°C to {:.0}°C\n\
         - Humidity: {:.0}% to {:.0}%\n\
         \n\
         Provide:\n\
         1. Assessment of current soil conditions\n\
         2. Specific maize farming actions to optimize growth\n\
         3. Warnings if any values fall outside the ideal range\n\
         4. Reminders about maize growth stages and relevant care\n\
         Format the output as plain text without markdown characters like asterisks or hashtags.",
        MOISTURE.ideal.0,
        MOISTURE.ideal.1,
        PH.ideal.0,
        PH.ideal.1,
        TEMPERATURE.ideal.0,
        TEMPERATURE.ideal.1,
        HUMIDITY.ideal.0,
        HUMIDITY.ideal.1,
        moisture = value(snapshot.soil_moisture),
        temperature = value(snapshot.soil_temperature),
        humidity = value(snapshot.soil_humidity),
        ph = value(snapshot.soil_ph),
    )
}

/// Strip emphasis and heading markers and put every `- ` item on its own line.
pub fn clean_format(text: &str) -> String {
    MARKUP_REPLACEMENTS
        .iter()
        .fold(text.to_owned(), |acc, (from, to)| acc.replace(from, to))
        .trim()
        .to_owned()
}

/// Prefix `full_text` with the bullet lines of its action section.
pub fn extract_summary(full_text: &str) -> String {
    let mut actions: Vec<&str> = Vec::new();
    let mut capturing = false;

    for line in full_text.lines().map(str::trim) {
        if line.to_lowercase().starts_with(ACTIONS_HEADING) {
            capturing = true;
            continue;
        }
        if capturing {
            if line.starts_with(WARNINGS_PREFIX) {
                break;
            }
            if line.starts_with('-') {
                actions.push(line);
            }
        }
    }

    if actions.is_empty() {
        actions.push(NO_ACTIONS_LINE);
    }

    format!(
        "Quick Summary of Actions:\n{}\n\nFull Recommendation:\n{}",
        actions.join("\n"),
        full_text
    )
}
