//! Centralized constants for the voice call service
//!
//! Defaults and fixed strings shared by the settings layer, the conversation
//! engine and the webhook renderer live here so they are defined once.

/// Service endpoints (defaults for local development)
pub mod endpoints {
    /// Telephony provider REST API
    pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

    /// External AI backend
    pub const AI_BACKEND_DEFAULT: &str = "http://localhost:8000";
}

/// Webhook and API paths served by this service
pub mod paths {
    pub const MAKE_CALL: &str = "/api/voice/make-call";
    pub const HANDLE_CALL: &str = "/api/voice/handle-call";
    pub const HANDLE_RESPONSE: &str = "/api/voice/handle-response";
    pub const COLLECT_CALLBACK: &str = "/api/voice/collect-callback";
    pub const STATUS_CALLBACK: &str = "/api/voice/handle-call/status";
    pub const SESSIONS: &str = "/api/voice/sessions";

    /// Query parameter carrying the fallback session payload
    pub const PAYLOAD_QUERY_PARAM: &str = "data";
}

/// Timeouts
pub mod timeouts {
    /// AI backend turn budget (ms)
    pub const AI_BACKEND_MS: u64 = 8_000;

    /// Upper bound accepted for the AI backend budget (ms)
    pub const AI_BACKEND_MAX_MS: u64 = 15_000;

    /// Readiness probe of the AI backend (ms)
    pub const READINESS_PROBE_MS: u64 = 2_000;

    /// Call placement request to the telephony provider (ms)
    pub const CALL_PLACEMENT_MS: u64 = 10_000;

    /// Human transfer connect timeout (seconds)
    pub const BRIDGE_SECS: u32 = 30;
}

/// Session store defaults
pub mod session {
    /// Sessions older than this are swept regardless of status (seconds)
    pub const MAX_AGE_SECS: u64 = 3_600;

    /// Interval of the background sweep (seconds)
    pub const SWEEP_INTERVAL_SECS: u64 = 600;

    /// Exchanges retained per session
    pub const HISTORY_LIMIT: usize = 10;

    /// Soft bound on concurrently stored sessions; exceeding it only warns
    pub const MAX_SESSIONS: usize = 1_000;

    /// Largest base64 fallback payload embedded in the webhook URL
    pub const MAX_FALLBACK_PAYLOAD_BYTES: usize = 3_000;
}

/// Conversation policy defaults
pub mod conversation {
    /// Case-insensitive substrings that request a human
    pub const ESCALATION_KEYWORDS: &[&str] = &[
        "human",
        "representative",
        "agent",
        "team",
        "transfer",
        "connect me",
        "talk to someone",
        "speak to someone",
    ];

    /// Completed exchanges after which escalation is offered
    pub const ESCALATION_OFFER_THRESHOLD: u32 = 5;

    /// Country code prepended to local numbers
    pub const DEFAULT_COUNTRY_CODE: &str = "91";

    /// Listen step after the greeting (seconds)
    pub const GREETING_GATHER_TIMEOUT_SECS: u32 = 5;
    pub const GREETING_SPEECH_TIMEOUT_SECS: u32 = 3;

    /// Listen step after an AI reply (seconds)
    pub const FOLLOWUP_GATHER_TIMEOUT_SECS: u32 = 4;
    pub const FOLLOWUP_SPEECH_TIMEOUT_SECS: u32 = 2;

    /// Listen step collecting callback details (seconds)
    pub const CALLBACK_GATHER_TIMEOUT_SECS: u32 = 10;
}

/// Knowledge chunking
pub mod knowledge {
    /// Maximum characters per knowledge chunk
    pub const MAX_CHUNK_CHARS: usize = 1_500;

    /// Smallest chunk size accepted by validation
    pub const MIN_CHUNK_CHARS: usize = 100;
}

/// Defaults for outbound call requests
pub mod calls {
    pub const DEFAULT_COMPANY_NAME: &str = "Your Company";
}

/// Fixed spoken lines
pub mod lines {
    pub const GENERIC_GREETING: &str =
        "Hello! This is a courtesy call from our team. Thank you for taking the time to speak with us.";

    pub const GREETING_PROMPT: &str =
        "What do you think about this? Are you interested or do you have any questions?";

    pub const NO_RESPONSE_GOODBYE: &str = "I didn't hear a response. Thank you for your time!";

    pub const FOLLOWUP_PROMPT: &str = "Is there anything else you'd like to know?";

    pub const FOLLOWUP_GOODBYE: &str = "Thank you for your time. Have a great day!";

    pub const ESCALATION_OFFER_PROMPT: &str =
        "Would you like me to connect you with one of our specialists? Just say connect me, or tell me if there's anything else.";

    pub const TRANSFER_CONFIRMATION: &str = "Absolutely! I'll connect you with one of our technical specialists right away. Please hold on while I transfer you.";

    pub const TRANSFER_FAILED: &str =
        "I was unable to connect you at this time. Please call our main number for assistance.";

    pub const CALLBACK_ACKNOWLEDGEMENT: &str = "I understand you'd like to speak with our team. Let me take your contact information so our specialists can call you back within 24 hours.";

    pub const CALLBACK_PROMPT: &str =
        "Please tell me your name and the best phone number to reach you.";

    pub const CALLBACK_GOODBYE: &str = "Thank you. Our team will contact you soon. Have a great day!";

    pub const CALLBACK_CONFIRMED: &str = "Perfect! I have your contact information. Our team will reach out to you within 24 hours to discuss your requirements. Thank you for your interest!";

    pub const SESSION_MISSING_APOLOGY: &str = "I'm sorry, we seem to have lost track of this call. Our team will follow up with you shortly. Goodbye!";

    pub const TECHNICAL_DIFFICULTIES: &str =
        "Hello, thank you for your time. We are experiencing technical difficulties. Goodbye!";

    pub const WEBHOOK_LIVENESS: &str = "Voice call webhook is reachable";
}
