//! Argument parsing for the subcommands and global connection flags.

use super::*;
use rstest::rstest;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(std::iter::once("greenmap").chain(args.iter().copied()))
}

#[rstest]
fn add_accepts_negative_coordinates() {
    let cli = parse(&["add", "--type", "tree", "--lat", "-33.86", "--lon", "-70.65"])
        .expect("add should parse");
    match cli.command {
        Command::Add(args) => assert!(format!("{args:?}").contains("lat: -33.86")),
        other => panic!("expected add, found {other:?}"),
    }
}

#[rstest]
fn connection_flags_are_global() {
    let cli = parse(&["list", "--offline", "--cache-dir", "/tmp/greenmap", "--city", "Томск"])
        .expect("global flags should parse after the subcommand");
    assert_eq!(cli.connection.offline, Some(true));
    assert_eq!(cli.connection.city.as_deref(), Some("Томск"));
    assert_eq!(
        cli.connection.cache_dir.as_deref().map(camino::Utf8Path::as_str),
        Some("/tmp/greenmap")
    );
}

#[rstest]
#[case(&["--offline", "false", "stats"], Some(false))]
#[case(&["stats"], None)]
fn offline_takes_an_optional_value(#[case] args: &[&str], #[case] expected: Option<bool>) {
    let cli = parse(args).expect("should parse");
    assert_eq!(cli.connection.offline, expected);
}

#[rstest]
#[case(&["update", "tree-1", "--lat", "52.5"])]
#[case(&["update", "tree-1", "--lon", "85.2"])]
#[case(&["add", "--type", "tree", "--lat", "52.5"])]
#[case(&["bbox", "--south", "52.4", "--west", "85.1", "--north", "52.6"])]
#[case(&["show"])]
fn incomplete_arguments_are_rejected(#[case] args: &[&str]) {
    assert!(parse(args).is_err());
}

#[rstest]
#[case(&["add", "--type", "tree", "--lat", "NaN", "--lon", "85.2"])]
#[case(&["add", "--type", "tree", "--lat", "52.5", "--lon", "inf"])]
#[case(&["update", "tree-1", "--lat", "infinity", "--lon", "85.2"])]
#[case(&["bbox", "--south", "nan", "--west", "85.1", "--north", "52.6", "--east", "85.3"])]
fn non_finite_coordinates_are_rejected(#[case] args: &[&str]) {
    let err = parse(args).expect_err("non-finite degrees");
    assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
}

#[rstest]
fn token_flag_is_global() {
    let cli = parse(&["sync", "--token", "ghp_example"]).expect("token should parse");
    assert_eq!(cli.connection.token.as_deref(), Some("ghp_example"));
}

#[rstest]
fn bbox_accepts_western_hemisphere() {
    let cli = parse(&[
        "bbox", "--south", "-34.0", "--west", "-71.0", "--north", "-33.0", "--east", "-70.0",
    ])
    .expect("bbox should parse");
    assert!(matches!(cli.command, Command::Bbox(_)));
}

#[rstest]
fn unknown_types_are_kept_verbatim() {
    let cli = parse(&["list", "--type", "flowerbed"]).expect("list should parse");
    match cli.command {
        Command::List { kind } => {
            assert_eq!(kind, Some(greenmap_core::GreenKind::Other("flowerbed".into())));
        }
        other => panic!("expected list, found {other:?}"),
    }
}
