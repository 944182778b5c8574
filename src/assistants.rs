//! Assistant personas and the request entry points built on them.

use crate::generator::{GenerationResult, ResponseGenerator};
use crate::stt::{SttClient, SttOptions, Transcription};
use crate::{Error, ErrorContext, Result};
use serde::Serialize;

const MARKDOWN_RULES: &str = "\
Format the answer as well-structured markdown:
- Use `##` headers to separate sections.
- Use tables for structured information.
- Use bullet points for lists and recommendations.
- Use *italic* and **bold** for emphasis.";

/// The three prompt personas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assistant {
    /// General health information.
    HealthChat,
    /// Diagnosis-style consultation informed by the patient's history.
    MedicalConsult { medical_history: String },
    /// Turns a meeting transcript into minutes.
    MeetingMinutes,
}

impl Assistant {
    pub fn system_prompt(&self) -> String {
        match self {
            Assistant::HealthChat => format!(
                "You are an experienced healthcare assistant providing general health \
                 information and guidance.\n\n{}\n\
                 Suggested sections: ## Overview, ## Key Points.\n\n\
                 Always recommend consulting a healthcare professional for serious concerns.",
                MARKDOWN_RULES
            ),
            Assistant::MedicalConsult { medical_history } => {
                let history = if medical_history.trim().is_empty() {
                    "none provided"
                } else {
                    medical_history.trim()
                };
                format!(
                    "You are a medical doctor able to diagnose and treat a wide range of \
                     conditions.\n\n{}\nSuggested sections: ## Diagnosis, ## Treatment Plan, \
                     ## Recommendations. Put medications, dosages and schedules in tables.\n\n\
                     Medical history: {}",
                    MARKDOWN_RULES, history
                )
            }
            Assistant::MeetingMinutes => format!(
                "You write meeting minutes from a meeting transcript.\n\n{}\n\
                 Suggested sections: ## Meeting Overview, ## Attendees, ## Agenda Items, \
                 ## Action Items, ## Next Steps. Keep timestamps that appear in the transcript.\n\n\
                 List action items in a table:\n\
                 | Task | Owner | Due Date | Status |\n\
                 |------|-------|----------|--------|",
                MARKDOWN_RULES
            ),
        }
    }

    fn missing_input_message(&self) -> &'static str {
        match self {
            Assistant::MeetingMinutes => "No transcript provided",
            _ => "No message provided",
        }
    }
}

/// Minutes generated from a recording, with the transcript they came from.
#[derive(Debug, Clone, Serialize)]
pub struct AudioMinutes {
    pub transcription: Transcription,
    #[serde(flatten)]
    pub result: GenerationResult,
}

impl ResponseGenerator {
    /// Run `assistant` on `input`, rejecting blank input before any backend call.
    pub async fn respond(
        &self,
        assistant: &Assistant,
        input: &str,
        audio_minutes: Option<f64>,
    ) -> Result<GenerationResult> {
        if input.trim().is_empty() {
            return Err(Error::validation_with_context(
                assistant.missing_input_message(),
                ErrorContext::new().with_source("assistant"),
            ));
        }
        self.generate(&assistant.system_prompt(), input, audio_minutes)
            .await
    }

    pub async fn chat(&self, message: &str) -> Result<GenerationResult> {
        self.respond(&Assistant::HealthChat, message, None).await
    }

    pub async fn medical_consult(
        &self,
        message: &str,
        medical_history: &str,
    ) -> Result<GenerationResult> {
        let assistant = Assistant::MedicalConsult {
            medical_history: medical_history.to_string(),
        };
        self.respond(&assistant, message, None).await
    }

    pub async fn meeting_minutes(&self, transcript: &str) -> Result<GenerationResult> {
        self.respond(&Assistant::MeetingMinutes, transcript, None)
            .await
    }

    /// Transcribe a recording and write minutes from it. The recording's
    /// duration is charged at the local model's audio rate.
    pub async fn meeting_minutes_from_audio(
        &self,
        stt: &SttClient,
        audio: &[u8],
        options: &SttOptions,
    ) -> Result<AudioMinutes> {
        let transcription = stt.transcribe(audio, options).await?;
        let result = self
            .respond(
                &Assistant::MeetingMinutes,
                &transcription.text,
                transcription.audio_minutes(),
            )
            .await?;
        Ok(AudioMinutes {
            transcription,
            result,
        })
    }
}
