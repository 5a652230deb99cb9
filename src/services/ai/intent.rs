use crate::models::Intent;
use crate::services::ai::{LlmProvider, Message};

const SYSTEM_PROMPT: &str = r#"You are an intent classifier for a healthcare front-desk assistant.

Classify the user's request into exactly one of these intents:
- schedule_appointment: book a new appointment
- cancel_appointment: cancel an existing appointment
- reschedule_appointment: change the date or time of an existing appointment
- check_appointments: view or list upcoming appointments
- patient_lookup: find or look up patient information
- general_query: general question about the practice or healthcare admin
- unknown: cannot determine intent

Also extract relevant entities (patient_name, date, time, provider, appointment_id, reason).

Return ONLY valid JSON (no markdown, no explanation) with this exact structure:
{
  "type": "<intent_type>",
  "confidence": <0.0-1.0>,
  "entities": {
    "patient_name": "<name or null>",
    "date": "<YYYY-MM-DD or null>",
    "time": "<HH:MM or null>",
    "provider": "<name or null>",
    "appointment_id": "<id or null>",
    "reason": "<reason or null>"
  },
  "summary": "<one-line summary of what the user wants>"
}"#;

/// Result of classifying one utterance. `failure` is set when the fallback
/// intent had to be used.
#[derive(Debug, Clone)]
pub struct Classification {
    pub intent: Intent,
    pub failure: Option<String>,
}

/// Never fails: any oracle or parse problem yields the fallback intent.
pub async fn classify(llm: &dyn LlmProvider, text: &str) -> Classification {
    let raw = match llm.chat(SYSTEM_PROMPT, &[Message::user(text)]).await {
        Ok(raw) => raw,
        Err(e) => {
            tracing::error!(error = %e, "intent classification call failed");
            return Classification {
                intent: Intent::fallback(text),
                failure: Some(format!("intent classification failed: {e}")),
            };
        }
    };

    match parse_intent_response(&raw) {
        Ok(intent) => {
            tracing::info!(
                intent = intent.kind.as_str(),
                confidence = intent.confidence,
                "intent detected"
            );
            Classification {
                intent,
                failure: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse classifier output, using fallback intent");
            Classification {
                intent: Intent::fallback(text),
                failure: Some(format!("intent classification failed: {e}")),
            }
        }
    }
}

fn parse_intent_response(response: &str) -> Result<Intent, serde_json::Error> {
    let trimmed = response.trim();

    // Strip markdown code fences
    let cleaned = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    let parsed = serde_json::from_str::<Intent>(cleaned).or_else(|first_err| {
        match (cleaned.find('{'), cleaned.rfind('}')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Intent>(&cleaned[start..=end])
            }
            _ => Err(first_err),
        }
    });

    parsed.map(|mut intent| {
        intent.confidence = intent.confidence.clamp(0.0, 1.0);
        intent
    })
}
