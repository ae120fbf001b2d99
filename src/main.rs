use log::{info, warn};
use quiz_duel_rust::{
    handlers::{connection_handler::handle_connection, timeout_handler::run_timeout_sweeper},
    loggers::file_logger::init_file_logger,
    models::question::QuestionPack,
    server_messages::PeerMap,
    state::GameState,
    storage::store::MatchStore,
};
use std::{
    collections::HashMap,
    env, fs,
    io::Error as IoError,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), IoError> {
    if let Err(error) = init_file_logger() {
        eprintln!("Logger init failed: {}", error);
    }
    info!("App started!");

    let addr = env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9001".to_string());
    let db_path = env::args()
        .nth(2)
        .unwrap_or_else(|| "quiz_duel.db".to_string());

    let store = match MatchStore::open(&db_path) {
        Ok(store) => store,
        Err(error) => {
            eprintln!("Could not open store at {}: {}", db_path, error);
            return Ok(());
        }
    };

    // Optional question pack to seed the pool with on boot.
    if let Some(pack_path) = env::args().nth(3) {
        match load_pack(&store, &pack_path) {
            Ok(count) => info!("Seeded {} questions from {}", count, pack_path),
            Err(error) => warn!("Could not seed questions from {}: {}", pack_path, error),
        }
    }

    let state = GameState::new(store);
    let peers: PeerMap = Arc::new(Mutex::new(HashMap::new()));

    tokio::spawn(run_timeout_sweeper(state.clone()));

    let try_socket = TcpListener::bind(&addr).await;
    let listener = try_socket.expect("Failed to bind");
    info!("Listening on: {}", addr);

    while let Ok((stream, addr)) = listener.accept().await {
        tokio::spawn(handle_connection(state.clone(), peers.clone(), stream, addr));
    }

    Ok(())
}

fn load_pack(store: &MatchStore, path: &str) -> Result<usize, String> {
    let data = fs::read_to_string(path).map_err(|error| error.to_string())?;
    let pack: QuestionPack = serde_json::from_str(&data).map_err(|error| error.to_string())?;
    let questions = pack.into_questions();
    for question in &questions {
        store.add_question(question).map_err(|error| error.to_string())?;
    }
    Ok(questions.len())
}
