// Prompt templates for the AI gateway

use crate::entities::ShipmentStatus;
use serde_json::{json, Value};

pub fn status_message(status: &str, location: &str, details: &str) -> String {
    format!(
        "Write a short, professional, and reassuring logistics status update sentence for a customer tracking their package.\n\
         Current Status: {status}\n\
         Location: {location}\n\
         Context/Details: {details}\n\
         \n\
         Keep it under 20 words. Do not include quotes."
    )
}

pub fn manifest(text: &str) -> String {
    format!(
        "Parse the following logistics manifest text into a JSON array of shipment objects.\n\
         \n\
         Text to parse:\n\
         \"{text}\"\n\
         \n\
         Extract: sender, recipient, origin, destination, trackingNumber (if present, else generate a placeholder), \
         status (infer from text, default to Created), estimatedDeliveryDays (number of days until delivery, if stated)."
    )
}

/// Response schema for manifest extraction (Gemini schema dialect)
pub fn manifest_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "sender": { "type": "STRING" },
                "recipient": { "type": "STRING" },
                "origin": { "type": "STRING" },
                "destination": { "type": "STRING" },
                "trackingNumber": { "type": "STRING" },
                "status": { "type": "STRING" },
                "estimatedDeliveryDays": {
                    "type": "NUMBER",
                    "description": "Estimated days until delivery"
                }
            }
        }
    })
}

pub fn next_action(status: ShipmentStatus) -> String {
    format!(
        "Given the logistics status \"{status}\", suggest a very short (3-5 words) immediate next action for the logistics manager."
    )
}

pub const SUPPORT_INSTRUCTION: &str = "You are a helpful, professional, and friendly customer support assistant for a parcel logistics company. \
You help users understand shipping terms, track packages (ask them to use the tracking lookup if they give a number, as you don't have direct database access), \
and provide general shipping advice. Keep answers concise.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_carry_inputs() {
        let p = status_message("In Transit", "Dallas, TX", "Weather delay");
        assert!(p.contains("Current Status: In Transit"));
        assert!(p.contains("Location: Dallas, TX"));
        assert!(p.contains("Context/Details: Weather delay"));

        assert!(manifest("3 boxes to Reno").contains("\"3 boxes to Reno\""));
        assert!(next_action(ShipmentStatus::OutForDelivery).contains("\"Out for Delivery\""));
    }

    #[test]
    fn test_manifest_schema_fields() {
        let schema = manifest_schema();
        let props = &schema["items"]["properties"];
        for field in ["sender", "recipient", "origin", "destination", "trackingNumber", "status"] {
            assert_eq!(props[field]["type"], "STRING", "{field}");
        }
        assert_eq!(props["estimatedDeliveryDays"]["type"], "NUMBER");
    }
}
