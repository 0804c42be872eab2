use std::{
    fmt::Debug,
    sync::{Arc, Mutex},
};

use tracing::{
    Event, Subscriber,
    dispatcher::DefaultGuard,
    field::{Field, Visit},
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
    util::SubscriberInitExt,
};

pub(crate) type LogMessages = Arc<Mutex<Vec<String>>>;

struct MessageRecorder {
    messages: LogMessages,
}

struct Message(String);

impl Visit for Message {
    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for MessageRecorder {
    fn on_event(&self, event: &Event<'_>, _context: Context<'_, S>) {
        let mut message = Message(String::new());
        event.record(&mut message);
        self.messages.lock().unwrap().push(message.0);
    }
}

/// Record the messages of every event logged on this thread until the guard
/// is dropped.
pub(crate) fn record_log_messages() -> (LogMessages, DefaultGuard) {
    let messages = LogMessages::default();
    let guard = tracing_subscriber::registry()
        .with(MessageRecorder {
            messages: messages.clone(),
        })
        .set_default();

    (messages, guard)
}
