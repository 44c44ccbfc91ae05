mod record;
mod sidecar;
mod xbe;

pub use record::{TitleId, TitleMetadata, TitleRecord, TitleSource};
pub use sidecar::{Sidecar, SidecarError, parse_sidecar, read_sidecar};
pub use xbe::{Certificate, XbeError, parse_certificate, read_certificate};
