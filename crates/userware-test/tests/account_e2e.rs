//! End-to-end tests for the account routes.
//!
//! Every request goes through the full application: the axum router, the
//! session, authentication, switch and messages middleware, the route
//! guards and the views.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use userware_auth::{Account, BcryptHasher, UserSwitchedOn, UserwareState};
use userware_core::Settings;
use userware_test::{MailOutbox, TestClient, TestResponse, TEST_HOST};

const PASSWORD: &str = "Secret123";
const LOGIN: &str = "/account/login/";
const LOGOUT: &str = "/account/logout/";
const PASSWORD_CHANGE: &str = "/account/password/change/";
const SWITCH_ON: &str = "/account/switch/on/";
const RESET_REQUEST: &str = "/account/password/reset/request/";

// ── Helpers ──────────────────────────────────────────────────────────

struct Harness {
    state: Arc<UserwareState>,
    outbox: MailOutbox,
}

impl Harness {
    fn new() -> Self {
        let outbox = MailOutbox::new();
        let settings = Settings {
            secret_key: "e2e-secret-key".to_string(),
            allowed_hosts: vec![TEST_HOST.to_string()],
            ..Settings::default()
        };
        let state = Arc::new(
            UserwareState::new(settings)
                .with_hasher(Arc::new(BcryptHasher { cost: 4 }))
                .with_notifier(Arc::new(outbox.clone())),
        );
        Self { state, outbox }
    }

    fn client(&self) -> TestClient {
        TestClient::for_state(&self.state).unwrap()
    }

    async fn account(&self, username: &str, email: &str) -> Account {
        self.create(Account::new(username, email)).await
    }

    async fn staff(&self, username: &str, email: &str) -> Account {
        let mut account = Account::new(username, email);
        account.is_staff = true;
        self.create(account).await
    }

    async fn create(&self, mut account: Account) -> Account {
        account
            .set_password(self.state.hasher(), PASSWORD)
            .await
            .unwrap();
        self.state.directory().create(account).await.unwrap()
    }

    async fn stored(&self, id: u64) -> Option<Account> {
        self.state.directory().get_by_id(id).await.unwrap()
    }

    /// A client whose session is logged in as `identifier`.
    async fn logged_in(&self, identifier: &str) -> TestClient {
        let mut client = self.client();
        let response = login(&mut client, identifier, PASSWORD).await;
        assert_eq!(response.status_code(), 302, "login failed: {}", response.text());
        client
    }
}

async fn login(client: &mut TestClient, identifier: &str, password: &str) -> TestResponse {
    client
        .post(LOGIN, &[("username", identifier), ("password", password)])
        .await
}

fn body(response: &TestResponse) -> Value {
    response.json().unwrap()
}

fn message_texts(body: &Value) -> Vec<String> {
    body["messages"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m["text"].as_str().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ═══════════════════════════════════════════════════════════════════════
// 1. LOGIN AND LOGOUT
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn login_page_describes_the_form() {
    let h = Harness::new();
    let response = h.client().get(LOGIN).await;
    assert_eq!(response.status_code(), 200);
    let page = body(&response);
    assert_eq!(page["form"], "user_authentication");
    assert_eq!(page["fields"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn login_with_username_or_email_sets_session_cookie() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;

    for identifier in ["alice", "ALICE@x.com"] {
        let mut client = h.client();
        let response = login(&mut client, identifier, PASSWORD).await;
        assert_eq!(response.status_code(), 302);
        assert_eq!(response.location(), Some("/"));
        let cookie = response.header("set-cookie").unwrap();
        assert!(cookie.starts_with("sessionid="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
    }
}

#[tokio::test]
async fn login_message_is_shown_on_the_next_page() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;
    let mut client = h.logged_in("alice").await;

    let first = body(&client.get(PASSWORD_CHANGE).await);
    assert_eq!(
        message_texts(&first),
        ["You are now logged in as \"alice\" ( alice@x.com )."]
    );

    let second = body(&client.get(PASSWORD_CHANGE).await);
    assert_eq!(
        message_texts(&second),
        ["Changing your password will log you out of all of your other sessions."]
    );
}

#[tokio::test]
async fn failed_login_is_generic() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;
    let mut client = h.client();

    let wrong_password = login(&mut client, "alice@x.com", "wrongpass").await;
    let unknown = login(&mut client, "mallory", PASSWORD).await;
    assert_eq!(wrong_password.status_code(), 400);
    assert_eq!(unknown.status_code(), 400);
    assert_eq!(body(&wrong_password)["errors"], body(&unknown)["errors"]);
    assert_eq!(
        body(&wrong_password)["errors"]["__all__"][0],
        "Login Failed.  Note that both fields may be case-sensitive."
    );
}

#[tokio::test]
async fn login_honors_safe_next_only() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;

    let mut client = h.client();
    let response = client
        .post(
            "/account/login/?next=%2Faccount%2Fpassword%2Fchange%2F",
            &[("username", "alice"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.location(), Some(PASSWORD_CHANGE));

    let mut client = h.client();
    let response = client
        .post(
            "/account/login/?next=https%3A%2F%2Fevil.com%2F",
            &[("username", "alice"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn login_page_redirects_when_already_logged_in() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;
    let mut client = h.logged_in("alice").await;
    let response = client.get(LOGIN).await;
    assert_eq!(response.status_code(), 302);
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;
    let mut client = h.logged_in("alice").await;

    let response = client.get(LOGOUT).await;
    assert_eq!(response.status_code(), 302);
    assert_eq!(response.location(), Some("/"));

    let response = client.get(PASSWORD_CHANGE).await;
    assert_eq!(response.status_code(), 302);
}

#[tokio::test]
async fn logout_rejects_post() {
    let h = Harness::new();
    let response = h.client().post(LOGOUT, &[]).await;
    assert_eq!(response.status_code(), 405);
}

// ═══════════════════════════════════════════════════════════════════════
// 2. GUARDS
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn anonymous_requests_are_sent_to_login() {
    let h = Harness::new();
    let mut client = h.client();
    for path in [
        "/account/",
        PASSWORD_CHANGE,
        "/account/delete/",
        "/account/disable/",
        SWITCH_ON,
        "/account/password/request/",
    ] {
        let response = client.get(path).await;
        assert_eq!(response.status_code(), 302, "{path}");
        let location = response.location().unwrap();
        assert!(location.starts_with("/account/login/?next=%2Faccount%2F"), "{location}");
    }
}

#[tokio::test]
async fn account_root_redirects_signed_in_users() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;
    let mut client = h.logged_in("alice").await;
    let response = client.get("/account/").await;
    assert_eq!(response.status_code(), 302);
    assert_eq!(response.location(), Some("/"));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let h = Harness::new();
    assert_eq!(h.client().get("/account/nope/").await.status_code(), 404);
}

// ═══════════════════════════════════════════════════════════════════════
// 3. PASSWORD CHANGE
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn password_change_keeps_this_session_and_ends_others() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;
    let mut laptop = h.logged_in("alice").await;
    let mut phone = h.logged_in("alice@x.com").await;

    let response = laptop
        .post(
            PASSWORD_CHANGE,
            &[
                ("old_password", PASSWORD),
                ("new_password1", "Brand-new1"),
                ("new_password2", "Brand-new1"),
            ],
        )
        .await;
    assert_eq!(response.status_code(), 302);

    assert_eq!(laptop.get(PASSWORD_CHANGE).await.status_code(), 200);
    assert_eq!(phone.get(PASSWORD_CHANGE).await.status_code(), 302);

    let mut fresh = h.client();
    assert_eq!(login(&mut fresh, "alice", PASSWORD).await.status_code(), 400);
    assert_eq!(login(&mut fresh, "alice", "Brand-new1").await.status_code(), 302);
}

#[tokio::test]
async fn password_change_errors_keep_the_warning() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;
    let mut client = h.logged_in("alice").await;
    client.get(PASSWORD_CHANGE).await;

    let response = client
        .post(
            PASSWORD_CHANGE,
            &[
                ("old_password", "not-it"),
                ("new_password1", "Brand-new1"),
                ("new_password2", "Brand-new1"),
            ],
        )
        .await;
    assert_eq!(response.status_code(), 400);
    let errors = body(&response);
    assert!(errors["errors"]["old_password"].is_array());
    assert_eq!(
        message_texts(&errors),
        ["Changing your password will log you out of all of your other sessions."]
    );
}

// ═══════════════════════════════════════════════════════════════════════
// 4. DELETE AND DISABLE
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn delete_account_removes_it_and_logs_out() {
    let h = Harness::new();
    let alice = h.account("alice", "alice@x.com").await;
    let mut client = h.logged_in("alice").await;

    let page = body(&client.get("/account/delete/").await);
    assert_eq!(page["form"], "user_deletion");

    let response = client
        .post(
            "/account/delete/",
            &[("username_or_email", "alice@x.com"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status_code(), 302);
    assert!(h.stored(alice.id).await.is_none());

    let response = client.get(LOGIN).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(
        message_texts(&body(&response)),
        ["Account 'alice' was permanently deleted. Sorry to see you go!"]
    );
}

#[tokio::test]
async fn delete_account_requires_matching_confirmation() {
    let h = Harness::new();
    let alice = h.account("alice", "alice@x.com").await;
    h.account("bob", "bob@x.com").await;
    let mut client = h.logged_in("alice").await;

    let response = client
        .post(
            "/account/delete/",
            &[("username_or_email", "bob"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status_code(), 400);
    assert!(h.stored(alice.id).await.is_some());
}

#[tokio::test]
async fn disable_account_blocks_future_logins() {
    let h = Harness::new();
    let alice = h.account("alice", "alice@x.com").await;
    let mut client = h.logged_in("alice").await;

    let response = client
        .post(
            "/account/disable/",
            &[("username_or_email", "alice"), ("password", PASSWORD)],
        )
        .await;
    assert_eq!(response.status_code(), 302);

    let stored = h.stored(alice.id).await.unwrap();
    assert!(!stored.is_active);
    assert_eq!(stored.email, format!("disabled-{}-alice@x.com", alice.id));
    assert_eq!(client.get(PASSWORD_CHANGE).await.status_code(), 302);
    assert_eq!(login(&mut h.client(), "alice", PASSWORD).await.status_code(), 400);
}

// ═══════════════════════════════════════════════════════════════════════
// 5. SWITCHING
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn staff_switch_acts_as_target_until_logout() {
    let h = Harness::new();
    let sam = h.staff("sam", "sam@x.com").await;
    h.account("bob", "bob@x.com").await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    h.state.signals().user_switched_on.connect(
        "recorder",
        Arc::new(move |event: &UserSwitchedOn| {
            recorder
                .lock()
                .unwrap()
                .push((event.sender.id, event.switched_username.clone()));
        }),
    );

    let mut client = h.logged_in("sam").await;
    let page = body(&client.get(SWITCH_ON).await);
    assert_eq!(page["form"], "user_switch");

    let response = client.post(SWITCH_ON, &[("switched_username", "bob")]).await;
    assert_eq!(response.status_code(), 302);
    assert_eq!(*seen.lock().unwrap(), [(sam.id, "bob".to_string())]);

    // Acting as bob: reset links go to bob and the staff route is closed.
    client.get("/account/password/request/").await;
    assert_eq!(h.outbox.last().unwrap().to_email, "bob@x.com");
    assert_eq!(client.get(SWITCH_ON).await.status_code(), 403);

    client.get(LOGOUT).await;
    assert_eq!(client.get(PASSWORD_CHANGE).await.status_code(), 302);

    let mut client = h.logged_in("sam").await;
    assert_eq!(client.get(SWITCH_ON).await.status_code(), 200);
}

#[tokio::test]
async fn switch_by_email_survives_target_email_change() {
    let h = Harness::new();
    h.staff("sam", "sam@x.com").await;
    let mut bob = h.account("bob", "bob@x.com").await;

    let mut client = h.logged_in("sam").await;
    let response = client.post(SWITCH_ON, &[("switched_username", "BOB@x.com")]).await;
    assert_eq!(response.status_code(), 302);

    bob.email = "robert@x.com".to_string();
    h.state.directory().update(&bob).await.unwrap();

    client.get("/account/password/request/").await;
    assert_eq!(h.outbox.last().unwrap().to_email, "robert@x.com");
    assert_eq!(client.get(SWITCH_ON).await.status_code(), 403);
}

#[tokio::test]
async fn non_staff_cannot_switch() {
    let h = Harness::new();
    h.account("bob", "bob@x.com").await;
    h.account("carol", "carol@x.com").await;
    let mut client = h.logged_in("bob").await;

    assert_eq!(client.get(SWITCH_ON).await.status_code(), 403);
    let response = client.post(SWITCH_ON, &[("switched_username", "carol")]).await;
    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn superuser_target_is_refused() {
    let h = Harness::new();
    h.staff("sam", "sam@x.com").await;
    let mut boss = Account::new("boss", "boss@x.com");
    boss.is_staff = true;
    boss.is_superuser = true;
    h.create(boss).await;

    let mut client = h.logged_in("sam").await;
    let response = client.post(SWITCH_ON, &[("switched_username", "boss")]).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(
        body(&response)["errors"]["switched_username"][0],
        "Operation is not permitted."
    );
}

// ═══════════════════════════════════════════════════════════════════════
// 6. PASSWORD RESET
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn reset_flow_through_the_emailed_link() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;
    let mut client = h.client();

    let response = client
        .post(RESET_REQUEST, &[("username_or_email", "Alice@X.com")])
        .await;
    assert_eq!(response.status_code(), 302);
    assert_eq!(response.location(), Some("/account/password/reset/request/sent/"));
    assert_eq!(client.get("/account/password/reset/request/sent/").await.status_code(), 200);

    let notification = h.outbox.last().unwrap();
    assert_eq!(notification.to_email, "alice@x.com");
    assert!(notification
        .reset_url
        .starts_with("http://testserver/account/password/reset/set/new/"));
    let link = h.outbox.last_reset_path().unwrap();

    let page = body(&client.get(&link).await);
    assert_eq!(page["validlink"], true);
    assert_eq!(page["form"], "user_set_password");

    let response = client
        .post(
            &link,
            &[("new_password1", "Brand-new1"), ("new_password2", "Brand-new1")],
        )
        .await;
    assert_eq!(response.status_code(), 302);
    assert_eq!(response.location(), Some("/account/password/reset/complete/"));

    // The link is bound to the old password hash.
    assert_eq!(client.get(&link).await.status_code(), 400);
    assert_eq!(login(&mut client, "alice", "Brand-new1").await.status_code(), 302);
}

#[tokio::test]
async fn reset_request_on_foreign_host_sends_nothing() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;

    for path in [RESET_REQUEST, "/account/password/request/"] {
        let mut client = h.logged_in("alice").await;
        client.set_host("evil.example");
        let response = if path == RESET_REQUEST {
            client.post(path, &[("username_or_email", "alice")]).await
        } else {
            client.get(path).await
        };
        assert_eq!(response.status_code(), 400, "{path}");
        assert!(body(&response)["error"]
            .as_str()
            .unwrap()
            .contains("evil.example"));
    }
    assert!(h.outbox.is_empty());
}

#[tokio::test]
async fn reset_request_for_unknown_identifier_fails() {
    let h = Harness::new();
    let response = h
        .client()
        .post(RESET_REQUEST, &[("username_or_email", "nobody@x.com")])
        .await;
    assert_eq!(response.status_code(), 400);
    assert!(body(&response)["errors"]["__all__"].is_array());
    assert!(h.outbox.is_empty());
}

#[tokio::test]
async fn invalid_reset_link_is_rejected() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;
    let response = h
        .client()
        .get("/account/password/reset/set/new/MQ-abc-123/")
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(body(&response)["validlink"], false);
}

#[tokio::test]
async fn password_request_mails_the_signed_in_account() {
    let h = Harness::new();
    h.account("alice", "alice@x.com").await;
    let mut client = h.logged_in("alice").await;

    let response = client.get("/account/password/request/").await;
    assert_eq!(response.status_code(), 302);
    assert_eq!(response.location(), Some("/account/password/reset/request/sent/"));
    assert_eq!(h.outbox.len(), 1);
    assert_eq!(h.outbox.last().unwrap().username, "alice");
}
