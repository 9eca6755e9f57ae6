//! Publishing a directory to a GitHub Pages branch with plain git commands.

use std::path::Path;

use tracing::{error, info};

use crate::config::{PagesConfig, RepoSlug};
use crate::contract::{CommandError, CommandRunner, CommandSpec};

/// Local branch the commit is made on; pushed as `master:<branch>`.
pub const LOCAL_BRANCH: &str = "master";

#[derive(Debug, thiserror::Error)]
pub enum PagesError {
    #[error("git step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: CommandError,
    },
}

/// `https://<token>@github.com/<owner>/<repo>.git`
pub fn remote_url(token: &str, repo: &RepoSlug) -> String {
    format!("https://{token}@github.com/{}/{}.git", repo.owner, repo.name)
}

/// The git commands that publish `dir`, each paired with a step name for error reports.
pub fn deploy_commands(pages: &PagesConfig, dir: &Path) -> Vec<(&'static str, CommandSpec)> {
    let git = |args: &[&str]| {
        CommandSpec::new("git")
            .args(args.iter().copied())
            .current_dir(dir)
            .redacting(pages.token.as_str())
    };
    let email = format!("{}@users.noreply.github.com", pages.actor);
    let refspec = format!("{LOCAL_BRANCH}:{}", pages.branch);
    let remote = remote_url(&pages.token, &pages.repository);
    let head = format!("refs/heads/{LOCAL_BRANCH}");

    vec![
        ("init", git(&["init"])),
        // Newer git may default to another initial branch name.
        ("set-branch", git(&["symbolic-ref", "HEAD", head.as_str()])),
        ("config-name", git(&["config", "user.name", pages.actor.as_str()])),
        ("config-email", git(&["config", "user.email", email.as_str()])),
        ("add", git(&["add", "."])),
        ("commit", git(&["commit", "-m", pages.commit_message.as_str()])),
        ("push", git(&["push", "--force", remote.as_str(), refspec.as_str()])),
    ]
}

/// Commit everything in `dir` into a fresh repository and force-push it to the pages branch.
///
/// Stops at the first failing git command.
pub fn deploy<R>(pages: &PagesConfig, dir: &Path, runner: &R) -> Result<(), PagesError>
where
    R: CommandRunner + ?Sized,
{
    info!(
        repository = %pages.repository,
        branch = %pages.branch,
        dir = %dir.display(),
        "Deploying to GitHub Pages"
    );
    for (step, spec) in deploy_commands(pages, dir) {
        if let Err(source) = runner.run(&spec) {
            error!(step, error = %source, "GitHub Pages deploy step failed");
            return Err(PagesError::Step { step, source });
        }
    }
    info!(repository = %pages.repository, branch = %pages.branch, "Pushed documentation");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_url_embeds_token() {
        let repo = RepoSlug {
            owner: "octo".into(),
            name: "docs".into(),
        };
        assert_eq!(
            remote_url("abc123", &repo),
            "https://abc123@github.com/octo/docs.git"
        );
    }
}
