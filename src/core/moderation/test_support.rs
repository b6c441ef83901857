// Test doubles for the classifier and chat transport ports.

use super::enforcement_engine::{ChatTransport, TransportError};
use super::message_classifier::{ClassifierError, SemanticClassifier};
use super::moderation_models::{ChatRef, IncomingMessage, MessageRef};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

enum Script {
    Reply(String),
    Fail,
    Hang,
}

/// Classifier that answers from a script and counts its calls.
pub struct ScriptedClassifier {
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl ScriptedClassifier {
    fn new(script: Script) -> Self {
        Self {
            script,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self::new(Script::Reply(reply.to_string()))
    }

    pub fn failing() -> Self {
        Self::new(Script::Fail)
    }

    pub fn hanging() -> Self {
        Self::new(Script::Hang)
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SemanticClassifier for ScriptedClassifier {
    async fn classify_offensive(&self, _text: &str) -> Result<String, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.script {
            Script::Reply(reply) => Ok(reply.clone()),
            Script::Fail => Err(ClassifierError::Transport("connection refused".to_string())),
            Script::Hang => std::future::pending().await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    ListAdmins,
    Delete(u64),
    Kick(u64),
    Ban(u64),
    Send(String),
}

/// Transport that records every call and can be told to fail some of them.
#[derive(Default)]
pub struct RecordingTransport {
    admins: HashSet<u64>,
    calls: Mutex<Vec<TransportCall>>,
    fail_delete: bool,
    fail_kick: bool,
    fail_admin_list: bool,
}

impl RecordingTransport {
    pub fn with_admins(admins: &[u64]) -> Self {
        Self {
            admins: admins.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn failing_kick(mut self) -> Self {
        self.fail_kick = true;
        self
    }

    pub fn failing_admin_list(mut self) -> Self {
        self.fail_admin_list = true;
        self
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Send(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: TransportCall, fail: bool) -> Result<(), TransportError> {
        self.calls.lock().unwrap().push(call);
        if fail {
            Err(TransportError::Api("Missing Permissions".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_message(&self, _chat: &ChatRef, text: &str) -> Result<(), TransportError> {
        self.record(TransportCall::Send(text.to_string()), false)
    }

    async fn delete_message(&self, message: &MessageRef) -> Result<(), TransportError> {
        self.record(TransportCall::Delete(message.message_id), self.fail_delete)
    }

    async fn kick(&self, _chat: &ChatRef, user_id: u64) -> Result<(), TransportError> {
        self.record(TransportCall::Kick(user_id), self.fail_kick)
    }

    async fn ban(&self, _chat: &ChatRef, user_id: u64) -> Result<(), TransportError> {
        self.record(TransportCall::Ban(user_id), false)
    }

    async fn list_administrators(&self, _chat: &ChatRef) -> Result<HashSet<u64>, TransportError> {
        self.record(TransportCall::ListAdmins, self.fail_admin_list)?;
        Ok(self.admins.clone())
    }
}

pub fn group_message(
    group_id: u64,
    channel_id: u64,
    message_id: u64,
    author_id: u64,
    author_name: &str,
    text: &str,
) -> IncomingMessage {
    IncomingMessage {
        message: MessageRef {
            chat: ChatRef::group(group_id, channel_id),
            message_id,
        },
        author_id,
        author_name: author_name.to_string(),
        text: text.to_string(),
    }
}
