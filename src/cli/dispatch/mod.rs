use crate::cli::actions::{Action, admin, server};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    if let Some(sub) = matches.subcommand_matches("admin") {
        return Ok(Action::CreateAdmin(admin::Args {
            dsn,
            email: sub
                .get_one::<String>("email")
                .cloned()
                .context("missing required argument: --email")?,
            password: sub
                .get_one::<String>("password")
                .cloned()
                .context("missing required argument: --password")?,
            nombre: sub
                .get_one::<String>("nombre")
                .cloned()
                .unwrap_or_else(|| "Admin Municipal".to_string()),
        }));
    }

    // The signing secret is only mandatory for the server itself.
    let token_secret = matches
        .get_one::<String>("token-secret")
        .cloned()
        .context("missing required argument: --token-secret")?;

    let allowed_origins = matches
        .get_one::<String>("allowed-origins")
        .map(|origins| {
            origins
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Action::Server(server::Args {
        port: matches.get_one::<u16>("port").copied().unwrap_or(3000),
        dsn,
        token_secret: SecretString::from(token_secret),
        allowed_origins,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn matches(args: &[&str]) -> clap::ArgMatches {
        commands::new().get_matches_from(args)
    }

    #[test]
    fn server_action_with_origins() -> Result<()> {
        temp_env::with_vars([("PADRON_PORT", None::<&str>)], || -> Result<()> {
            let action = handler(&matches(&[
                "padron",
                "--dsn",
                "postgres://localhost/padron",
                "--token-secret",
                "secreto",
                "--allowed-origins",
                "http://localhost:5173, https://padron.municipalidad.cl,",
            ]))?;

            match action {
                Action::Server(args) => {
                    assert_eq!(args.port, 3000);
                    assert_eq!(
                        args.allowed_origins,
                        vec![
                            "http://localhost:5173".to_string(),
                            "https://padron.municipalidad.cl".to_string()
                        ]
                    );
                }
                Action::CreateAdmin(_) => panic!("expected server action"),
            }
            Ok(())
        })
    }

    #[test]
    fn server_requires_token_secret() {
        temp_env::with_vars([("PADRON_TOKEN_SECRET", None::<&str>)], || {
            let result = handler(&matches(&[
                "padron",
                "--dsn",
                "postgres://localhost/padron",
            ]));
            assert!(result.is_err());
        });
    }

    #[test]
    fn admin_action_does_not_need_token_secret() -> Result<()> {
        let action = handler(&matches(&[
            "padron",
            "--dsn",
            "postgres://localhost/padron",
            "admin",
            "--email",
            "admin@municipalidad.cl",
            "--password",
            "Admin1234",
        ]))?;

        match action {
            Action::CreateAdmin(args) => {
                assert_eq!(args.email, "admin@municipalidad.cl");
                assert_eq!(args.nombre, "Admin Municipal");
            }
            Action::Server(_) => panic!("expected admin action"),
        }
        Ok(())
    }
}
