use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::linalg::vector::Vector;
use crate::{E, Error, I};

/// Complete configuration of a solve.
///
/// Two wire forms parse into this type: the textual `key:value` grammar
/// ([`FromStr`]) and the flat numeric layout ([`SolverConfig::from_layout`]).
/// Both reject malformed input atomically. The serde derives cover hosts
/// that persist solver setups (e.g. a registry database).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub dim_args: I,
    pub dim_params: I,
    /// Termination tolerance on successive iterates, strictly positive.
    pub eps: E,
    /// Whether the solver varies the args family (params held fixed).
    pub by_args: bool,
    /// Seed of the args family, `dim_args` long.
    pub args: Vec<E>,
    /// Seed of the params family, `dim_params` long.
    pub params: Vec<E>,
    /// Lower corner of the compact, one coordinate per active axis.
    pub begin: Vec<E>,
    /// Upper corner of the compact, one coordinate per active axis.
    pub end: Vec<E>,
}

impl SolverConfig {
    /// Dimension of the family the solver varies.
    pub fn active_dim(&self) -> I {
        if self.by_args {
            self.dim_args
        } else {
            self.dim_params
        }
    }

    /// Parses the flat numeric layout
    /// `[dimArgs, dimParams, eps, flag, args…, params…, begin…, end…]`
    /// where `flag` is 1 for args mode and 0 for params mode and the corner
    /// blocks are `active_dim` wide.
    pub fn from_layout(layout: &Vector) -> Result<Self, Error> {
        let coords = layout.coords();
        if coords.len() < 4 {
            tracing::warn!(len = coords.len(), "configuration layout shorter than 4");
            return Err(Error::WrongArg);
        }
        let dim_args = parse_dim(coords[0])?;
        let dim_params = parse_dim(coords[1])?;
        let eps = coords[2];
        if !(eps > 0.0) {
            tracing::warn!(eps, "termination tolerance must be positive");
            return Err(Error::WrongArg);
        }
        let flag = coords[3].round();
        if flag != 1.0 && flag != 0.0 {
            tracing::warn!(flag, "solve-axis flag must be 0 or 1");
            return Err(Error::WrongArg);
        }
        let by_args = flag == 1.0;

        let active = if by_args { dim_args } else { dim_params };
        let expected = 4 + dim_args + dim_params + 2 * active;
        if coords.len() != expected {
            tracing::warn!(
                len = coords.len(),
                expected,
                "configuration layout has the wrong length"
            );
            return Err(Error::WrongProblem);
        }

        let args_at = 4;
        let params_at = args_at + dim_args;
        let begin_at = params_at + dim_params;
        let end_at = begin_at + active;
        Ok(Self {
            dim_args,
            dim_params,
            eps,
            by_args,
            args: coords[args_at..params_at].to_vec(),
            params: coords[params_at..begin_at].to_vec(),
            begin: coords[begin_at..end_at].to_vec(),
            end: coords[end_at..end_at + active].to_vec(),
        })
    }
}

impl FromStr for SolverConfig {
    type Err = Error;

    /// Parses the textual form: whitespace-separated `key:value` tokens,
    ///
    /// ```text
    ///   args:2 params:2 eps:0.001 pararg:args a0:0 a1:0 p0:0 p1:0
    ///   b0:-5 b1:-5 e0:5 e1:5
    /// ```
    ///
    /// with `4 + dimArgs + dimParams + 2·max(dimArgs, dimParams)` tokens in
    /// total; the corner blocks are `max`-wide and the first `active_dim`
    /// entries of each are read.
    fn from_str(text: &str) -> Result<Self, Error> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() < 4 {
            tracing::warn!(len = tokens.len(), "configuration has fewer than 4 tokens");
            return Err(Error::WrongArg);
        }
        let mut values = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let mut pieces = token.split(':');
            match (pieces.next(), pieces.next(), pieces.next()) {
                (Some(_), Some(value), None) => values.push(value),
                _ => {
                    tracing::warn!(token = *token, "configuration token is not key:value shaped");
                    return Err(Error::WrongArg);
                }
            }
        }

        let dim_args: I = values[0].parse().map_err(|_| {
            tracing::warn!(token = values[0], "cannot parse args dimension");
            Error::WrongArg
        })?;
        let dim_params: I = values[1].parse().map_err(|_| {
            tracing::warn!(token = values[1], "cannot parse params dimension");
            Error::WrongArg
        })?;
        let eps: E = values[2].parse().map_err(|_| {
            tracing::warn!(token = values[2], "cannot parse termination tolerance");
            Error::WrongArg
        })?;
        if !(eps > 0.0) {
            tracing::warn!(eps, "termination tolerance must be positive");
            return Err(Error::WrongArg);
        }
        let by_args = if values[3].eq_ignore_ascii_case("args") {
            true
        } else if values[3].eq_ignore_ascii_case("params") {
            false
        } else {
            tracing::warn!(token = values[3], "solve axis must be args or params");
            return Err(Error::WrongArg);
        };

        let widest = dim_args.max(dim_params);
        let expected = 4 + dim_args + dim_params + 2 * widest;
        if values.len() != expected {
            tracing::warn!(
                len = values.len(),
                expected,
                "configuration has the wrong token count"
            );
            return Err(Error::WrongProblem);
        }

        let active = if by_args { dim_args } else { dim_params };
        let args_at = 4;
        let params_at = args_at + dim_args;
        let begin_at = params_at + dim_params;
        let end_at = begin_at + widest;
        Ok(Self {
            dim_args,
            dim_params,
            eps,
            by_args,
            args: parse_coords(&values[args_at..params_at])?,
            params: parse_coords(&values[params_at..begin_at])?,
            begin: parse_coords(&values[begin_at..begin_at + active])?,
            end: parse_coords(&values[end_at..end_at + active])?,
        })
    }
}

fn parse_dim(value: E) -> Result<I, Error> {
    let rounded = value.round();
    if !(rounded >= 0.0) || rounded > I::MAX as E {
        tracing::warn!(value, "cannot interpret coordinate as a dimension");
        return Err(Error::WrongArg);
    }
    Ok(rounded as I)
}

fn parse_coords(values: &[&str]) -> Result<Vec<E>, Error> {
    values
        .iter()
        .map(|value| {
            value.parse::<E>().map_err(|_| {
                tracing::warn!(token = *value, "cannot parse coordinate");
                Error::AnyOther
            })
        })
        .collect()
}
