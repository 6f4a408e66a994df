use std::fmt;

use crate::{
    error::BoxError,
    typing::{EvaluateIns, EvaluateRes, FitIns, FitRes, ParametersRes, PropertiesIns, PropertiesRes},
};

/// The capability contract a learning implementation must satisfy.
///
/// Every call is synchronous and runs to completion before the next
/// instruction is received. Failures are not caught nor retried, they end the
/// current session.
pub trait Client {
    /// Reports static attributes of the client.
    ///
    /// Echoes back the requested config unless overridden.
    fn get_properties(&mut self, ins: PropertiesIns) -> Result<PropertiesRes, BoxError> {
        Ok(PropertiesRes {
            properties: ins.config,
        })
    }

    /// Returns the current model state.
    ///
    /// A client with no model loaded answers with empty `Parameters` instead of
    /// failing.
    fn get_parameters(&mut self) -> Result<ParametersRes, BoxError>;

    /// Runs one refinement round.
    ///
    /// # Arguments
    /// * `ins` - The instruction, see `FitIns::seed` for whether to load its parameters.
    fn fit(&mut self, ins: FitIns) -> Result<FitRes, BoxError>;

    /// Runs one assessment pass, with the same seeding rule as `fit`.
    fn evaluate(&mut self, ins: EvaluateIns) -> Result<EvaluateRes, BoxError>;
}

impl<C: Client + ?Sized> Client for Box<C> {
    fn get_properties(&mut self, ins: PropertiesIns) -> Result<PropertiesRes, BoxError> {
        (**self).get_properties(ins)
    }

    fn get_parameters(&mut self) -> Result<ParametersRes, BoxError> {
        (**self).get_parameters()
    }

    fn fit(&mut self, ins: FitIns) -> Result<FitRes, BoxError> {
        (**self).fit(ins)
    }

    fn evaluate(&mut self, ins: EvaluateIns) -> Result<EvaluateRes, BoxError> {
        (**self).evaluate(ins)
    }
}

/// Names a `Client` operation, used to report which one failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    GetProperties,
    GetParameters,
    Fit,
    Evaluate,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GetProperties => "get properties",
            Self::GetParameters => "get parameters",
            Self::Fit => "fit",
            Self::Evaluate => "evaluate",
        };

        f.write_str(s)
    }
}
