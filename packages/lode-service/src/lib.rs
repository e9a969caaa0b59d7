pub mod cache;
pub mod engine;
pub mod mapper;

pub use cache::MappingCache;
pub use engine::{
	FLUSH_CHUNK_SIZE, Page, SearchEngine, SearchOutcome, soft_delete_in_force, start_query,
};
pub use mapper::ResultMapper;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug)]
pub enum ServiceError {
	Configuration { message: String },
	ContractViolation { message: String },
	InvalidRequest { message: String },
	Transport { message: String },
}

impl std::fmt::Display for ServiceError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Configuration { message } => write!(f, "Configuration error: {message}"),
			Self::ContractViolation { message } => write!(f, "Contract violation: {message}"),
			Self::InvalidRequest { message } => write!(f, "Invalid request: {message}"),
			Self::Transport { message } => write!(f, "Transport error: {message}"),
		}
	}
}

impl std::error::Error for ServiceError {}

impl From<lode_query::Error> for ServiceError {
	fn from(err: lode_query::Error) -> Self {
		match err {
			lode_query::Error::Configuration { message } => Self::Configuration { message },
			lode_query::Error::ContractViolation { message } => Self::ContractViolation { message },
		}
	}
}

impl From<color_eyre::Report> for ServiceError {
	fn from(err: color_eyre::Report) -> Self {
		Self::Transport { message: format!("{err:#}") }
	}
}
