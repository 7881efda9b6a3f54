//! Unit tests for GitHub locator parsing.

use rstest::rstest;
use url::Url;

use super::{GithubError, PullRequestLocator, PullRequestNumber, RepositoryLocator};

fn api_base() -> Url {
    Url::parse("https://api.github.com").expect("api base should parse")
}

#[rstest]
fn parses_standard_full_name() {
    let locator = RepositoryLocator::parse_full_name("octo/repo", &api_base())
        .expect("should parse owner/repo");
    assert_eq!(locator.owner().as_str(), "octo", "owner mismatch");
    assert_eq!(locator.repository().as_str(), "repo", "repository mismatch");
    assert_eq!(
        locator.api_base().as_str(),
        "https://api.github.com/",
        "api base mismatch"
    );
}

#[rstest]
#[case::missing_separator("octorepo")]
#[case::empty_owner("/repo")]
#[case::empty_repository("octo/")]
#[case::extra_segment("octo/repo/extra")]
#[case::blank("")]
fn rejects_malformed_full_names(#[case] full_name: &str) {
    let result = RepositoryLocator::parse_full_name(full_name, &api_base());
    assert!(
        matches!(result, Err(GithubError::InvalidRepositoryName { .. })),
        "expected InvalidRepositoryName for {full_name:?}, got {result:?}"
    );
}

#[rstest]
fn rejects_zero_pull_request_number() {
    let result = PullRequestNumber::new(0);
    assert!(
        matches!(result, Err(GithubError::InvalidPullRequestNumber)),
        "expected InvalidPullRequestNumber for zero, got {result:?}"
    );
}

#[rstest]
fn builds_pull_request_api_path() {
    let repository = RepositoryLocator::parse_full_name("octo/repo", &api_base())
        .expect("should parse owner/repo");
    let number = PullRequestNumber::new(42).expect("number should be valid");
    let locator = PullRequestLocator::new(repository, number);

    assert_eq!(locator.pull_request_path(), "/repos/octo/repo/pulls/42");
    assert_eq!(locator.number().get(), 42_u64, "number mismatch");
}
