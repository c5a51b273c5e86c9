#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use smartschool_api::service::{GroupService, Reply, ResultCode, SaveClass, SaveGroup};

pub const SCHOOL_MARKUP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<groups>
  <group>
    <name>Root</name>
    <desc>Alle groepen</desc>
    <type>G</type>
    <code>ROOT</code>
    <visible>1</visible>
    <isOfficial>0</isOfficial>
    <group>
      <name>Personeel</name>
      <desc>Staff</desc>
      <type>G</type>
      <code>PERS</code>
      <visible>1</visible>
      <group>
        <name>Directie</name>
        <desc>Board</desc>
        <type>G</type>
        <code>DIR</code>
      </group>
    </group>
    <group>
      <name>Leerlingen</name>
      <desc>Students</desc>
      <type>G</type>
      <code>LL</code>
      <visible>1</visible>
      <group>
        <name>2B</name>
        <desc>Tweede B</desc>
        <type>K</type>
        <code>C2B</code>
        <untis>2B</untis>
        <visible>1</visible>
        <isOfficial>1</isOfficial>
        <adminNumber>1234</adminNumber>
        <instituteNumber>5678</instituteNumber>
        <titulars>
          <username>jdoe</username>
          <username>asmith</username>
        </titulars>
      </group>
      <group>
        <name>1A</name>
        <desc>Eerste A</desc>
        <type>K</type>
        <code>C1A</code>
        <visible>1</visible>
        <isOfficial>1</isOfficial>
        <coAccountLabel>Ouders 1A</coAccountLabel>
        <adminNumber>1234</adminNumber>
        <instituteNumber>5678</instituteNumber>
      </group>
    </group>
  </group>
</groups>
"#;

pub fn encode(markup: &str) -> String {
    STANDARD.encode(markup.as_bytes())
}

/// In-memory stand-in for the remote platform.
pub struct FakeService {
    markup: Mutex<Reply>,
    result: Mutex<ResultCode>,
    accounts: Mutex<HashMap<String, Reply>>,
    error_codes: Reply,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Returns `Pending` once before completing, so concurrent requests overlap.
struct YieldOnce(bool);

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            return Poll::Ready(());
        }
        self.0 = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

impl FakeService {
    pub fn new(markup: &str) -> Self {
        Self {
            markup: Mutex::new(Reply::Payload(encode(markup))),
            result: Mutex::new(ResultCode::SUCCESS),
            accounts: Mutex::new(HashMap::new()),
            error_codes: Reply::Payload(r#"{"12": "group code already in use", "19": "no accounts"}"#.into()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Highest number of member listings that were pending at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_markup(&self, markup: &str) {
        *self.markup.lock().unwrap() = Reply::Payload(encode(markup));
    }

    pub fn set_markup_reply(&self, reply: Reply) {
        *self.markup.lock().unwrap() = reply;
    }

    pub fn set_result(&self, code: ResultCode) {
        *self.result.lock().unwrap() = code;
    }

    pub fn set_accounts(&self, group: &str, reply: Reply) {
        self.accounts.lock().unwrap().insert(group.to_string(), reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> ResultCode {
        self.calls.lock().unwrap().push(call);
        *self.result.lock().unwrap()
    }
}

#[async_trait]
impl GroupService for FakeService {
    async fn fetch_group_tree_markup(&self) -> Reply {
        self.calls.lock().unwrap().push("fetch_group_tree_markup".into());
        self.markup.lock().unwrap().clone()
    }

    async fn save_group(&self, request: &SaveGroup) -> ResultCode {
        self.record(format!(
            "save_group {} parent={}",
            request.name, request.parent_code
        ))
    }

    async fn save_class(&self, request: &SaveClass) -> ResultCode {
        self.record(format!(
            "save_class {} parent={} admin={}",
            request.name, request.parent_code, request.admin_number
        ))
    }

    async fn delete_group(&self, code: &str) -> ResultCode {
        self.record(format!("delete_group {code}"))
    }

    async fn move_account_to_class(&self, uid: &str, class_name: &str, date: &str) -> ResultCode {
        self.record(format!("move_account_to_class {uid} {class_name} {date}"))
    }

    async fn add_account_to_group(&self, uid: &str, group_name: &str) -> ResultCode {
        self.record(format!("add_account_to_group {uid} {group_name}"))
    }

    async fn remove_account_from_group(&self, uid: &str, group_name: &str, date: &str) -> ResultCode {
        self.record(format!("remove_account_from_group {uid} {group_name} {date}"))
    }

    async fn fetch_accounts_for_group(&self, group_name: &str) -> Reply {
        self.calls
            .lock()
            .unwrap()
            .push(format!("fetch_accounts_for_group {group_name}"));
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        YieldOnce(false).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.accounts
            .lock()
            .unwrap()
            .get(group_name)
            .cloned()
            .unwrap_or(Reply::Code(ResultCode::NO_ACCOUNTS))
    }

    async fn fetch_error_codes(&self) -> Reply {
        self.calls.lock().unwrap().push("fetch_error_codes".into());
        self.error_codes.clone()
    }
}
