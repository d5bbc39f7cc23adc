pub mod openfga;

pub use openfga::{
    AuthorizationService, BatchWriter, InMemoryAuthorizationService, OpenFgaClient,
    OpenFgaError, ScopedOpenFgaClient,
};
