use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct DisplayHabit {
    id: i64,
    name: String,
    category: String,
    goal: Option<i64>,
    value: i64,
}

#[derive(Debug, Deserialize)]
struct BoardView {
    phase: String,
    today: String,
    habits: Vec<DisplayHabit>,
    draft: Value,
    expanded: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct HistoryView {
    expanded: Option<i64>,
    history: Vec<Value>,
    week_total: i64,
    days: Vec<Value>,
}

struct TestServer {
    base_url: String,
    data_path: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("habit_tracker_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/board")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_habit_tracker"))
        .env("PORT", port.to_string())
        .env("HABITS_DATA_PATH", &data_path)
        .env_remove("HABITS_STORE_URL")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer {
        base_url,
        data_path,
        child,
    }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn board(client: &Client, server: &TestServer) -> BoardView {
    client
        .get(format!("{}/api/board", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn reload(client: &Client, server: &TestServer) -> BoardView {
    let response = client
        .post(format!("{}/api/reload", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

async fn create(client: &Client, server: &TestServer, form: Value) -> BoardView {
    let response = client
        .post(format!("{}/api/habits", server.base_url))
        .json(&form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

async fn record(client: &Client, server: &TestServer, id: i64, value: Value) -> DisplayHabit {
    let response = client
        .put(format!("{}/api/habits/{id}/value", server.base_url))
        .json(&json!({ "value": value }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    response.json().await.unwrap()
}

/// Reloads until the stored value for `id` shows up; writes land in the
/// background after the edit response.
async fn reload_until_value(client: &Client, server: &TestServer, id: i64, value: i64) -> BoardView {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let view = reload(client, server).await;
        if view.habits.iter().any(|h| h.id == id && h.value == value) {
            return view;
        }
        if Instant::now() > deadline {
            panic!("value {value} for habit {id} never persisted");
        }
        sleep(Duration::from_millis(50)).await;
    }
}

fn stored_logs(server: &TestServer, habit_id: i64) -> Vec<Value> {
    let raw = std::fs::read(&server.data_path).expect("store file exists");
    let data: Value = serde_json::from_slice(&raw).unwrap();
    data["daily_logs"]["rows"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .filter(|row| row["habit_id"] == json!(habit_id))
        .collect()
}

#[tokio::test]
async fn http_water_scenario_keeps_one_log_per_day() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let view = create(
        &client,
        &server,
        json!({ "name": "Water", "category": "Health", "goal": "8" }),
    )
    .await;
    assert_eq!(view.phase, "ready");
    let water = view.habits.last().expect("habit listed");
    assert_eq!(water.name, "Water");
    assert_eq!(water.category, "Health");
    assert_eq!(water.goal, Some(8));
    assert_eq!(water.value, 0);
    assert_eq!(view.draft["name"], json!(""));
    let id = water.id;

    let row = record(&client, &server, id, json!("5")).await;
    assert_eq!(row.value, 5);
    reload_until_value(&client, &server, id, 5).await;

    record(&client, &server, id, json!(3)).await;
    let view = reload_until_value(&client, &server, id, 3).await;

    let logs = stored_logs(&server, id);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["value"], json!(3));
    assert_eq!(logs[0]["log_date"], json!(view.today));
}

#[tokio::test]
async fn http_empty_name_is_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let before = board(&client, &server).await.habits.len();

    let response = client
        .post(format!("{}/api/habits", server.base_url))
        .json(&json!({ "name": "   ", "category": "Health" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.text().await.unwrap(), "Please enter a habit name");
    let after = board(&client, &server).await;
    assert_eq!(after.habits.len(), before);
    assert_eq!(after.draft["category"], json!("Health"));
}

#[tokio::test]
async fn http_delete_requires_confirmation() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let view = create(&client, &server, json!({ "name": "Stretch" })).await;
    let habit = view.habits.last().expect("habit listed");
    assert_eq!(habit.category, "General");
    let id = habit.id;

    let unconfirmed: BoardView = client
        .delete(format!("{}/api/habits/{id}", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(unconfirmed.habits.iter().any(|h| h.id == id));

    let confirmed: BoardView = client
        .delete(format!("{}/api/habits/{id}?confirmed=true", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(confirmed.habits.iter().all(|h| h.id != id));
    assert!(reload(&client, &server).await.habits.iter().all(|h| h.id != id));
}

#[tokio::test]
async fn http_history_toggles_with_week_total() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let view = create(&client, &server, json!({ "name": "Read", "category": "Mind" })).await;
    let id = view.habits.last().expect("habit listed").id;
    record(&client, &server, id, json!(4)).await;
    reload_until_value(&client, &server, id, 4).await;

    let url = format!("{}/api/habits/{id}/history", server.base_url);
    let opened: HistoryView = client.post(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(opened.expanded, Some(id));
    assert_eq!(opened.history.len(), 1);
    assert_eq!(opened.week_total, 4);
    assert_eq!(opened.days.len(), 8);
    assert_eq!(board(&client, &server).await.expanded, Some(id));

    let closed: HistoryView = client.post(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(closed.expanded, None);
    assert!(closed.history.is_empty());
    assert_eq!(closed.week_total, 0);
}

#[tokio::test]
async fn http_value_for_unknown_habit_is_not_found() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .put(format!("{}/api/habits/999999/value", server.base_url))
        .json(&json!({ "value": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_history_for_unknown_habit_is_not_found() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/habits/999999/history", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_ne!(board(&client, &server).await.expanded, Some(999999));
}
