#![allow(dead_code)]

use firestore_proto::{ProtoClient, Session};

#[derive(Clone, PartialEq, prost::Message)]
pub struct Task {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(uint32, tag = "2")]
    pub attempts: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub payload: Vec<u8>,
}

pub fn task(id: &str) -> Task {
    Task {
        id: id.to_string(),
        attempts: 0,
        payload: id.as_bytes().to_vec(),
    }
}

pub fn in_memory_client() -> ProtoClient {
    ProtoClient::new(Session::in_memory("queue-tests"))
}
