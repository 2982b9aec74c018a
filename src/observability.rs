use biometrics::{Collector, Counter, Moments};

pub(crate) static PROVIDER_REQUESTS: Counter = Counter::new("aidsnap.provider.requests");
pub(crate) static PROVIDER_REQUEST_ERRORS: Counter =
    Counter::new("aidsnap.provider.request_errors");
pub(crate) static PROVIDER_EMPTY_RESPONSES: Counter =
    Counter::new("aidsnap.provider.empty_responses");
pub(crate) static PROVIDER_REQUEST_DURATION: Moments =
    Moments::new("aidsnap.provider.request_duration_seconds");

pub(crate) static CHAT_SENDS: Counter = Counter::new("aidsnap.chat.sends");
pub(crate) static CHAT_SENDS_REJECTED: Counter = Counter::new("aidsnap.chat.sends_rejected");
pub(crate) static CHAT_SEND_FAILURES: Counter = Counter::new("aidsnap.chat.send_failures");
pub(crate) static CHAT_TURN_DURATION: Moments =
    Moments::new("aidsnap.chat.turn_duration_seconds");

pub(crate) static GUIDES_SAVED: Counter = Counter::new("aidsnap.guides.saved");
pub(crate) static GUIDES_REMOVED: Counter = Counter::new("aidsnap.guides.removed");
pub(crate) static STORAGE_WRITES: Counter = Counter::new("aidsnap.storage.writes");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&PROVIDER_REQUESTS);
    collector.register_counter(&PROVIDER_REQUEST_ERRORS);
    collector.register_counter(&PROVIDER_EMPTY_RESPONSES);
    collector.register_moments(&PROVIDER_REQUEST_DURATION);

    collector.register_counter(&CHAT_SENDS);
    collector.register_counter(&CHAT_SENDS_REJECTED);
    collector.register_counter(&CHAT_SEND_FAILURES);
    collector.register_moments(&CHAT_TURN_DURATION);

    collector.register_counter(&GUIDES_SAVED);
    collector.register_counter(&GUIDES_REMOVED);
    collector.register_counter(&STORAGE_WRITES);
}
