pub mod connection;
pub mod datastore;
mod rpc_error;
pub mod serializer;

pub use connection::{Connection, ConnectionBuilder, RequestContext};
pub use datastore::{
    Datastore, DatastoreArc, HttpDatastore, HttpDatastoreBuilder, InMemoryDatastore, NoopTokenProvider,
    TokenProvider, TokenProviderArc,
};
pub use serializer::JsonProtoSerializer;
