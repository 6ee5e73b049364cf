pub mod openfda_client;

pub use openfda_client::{OpenFdaClient, OPENFDA_LABEL_URL};
