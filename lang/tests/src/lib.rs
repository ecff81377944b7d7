pub mod utils {
    use blox_driver::{Conf, Project, RunOptions, test_project};
    use std::path::PathBuf;

    /// Runs a project under the default configuration and checks its
    /// `[expect]` table, in both stepping modes.
    pub fn wrapper_proj(path: impl Into<PathBuf>) {
        let project = match Project::new(path) {
            | Ok(project) => project,
            | Err(err) => {
                eprintln!("{}", err);
                panic!("Error loading project");
            }
        };
        let conf = Conf::default();
        for fast in [false, true] {
            if let Err(err) = test_project(&project, &conf, RunOptions { fast, max_ticks: None }) {
                eprintln!("{}", err);
                panic!("Error running project (fast = {})", fast);
            }
        }
    }
}

#[macro_export]
macro_rules! proj_test {
    ($name:ident, $file:expr) => {
        #[test]
        fn $name() {
            let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("../../lib")
                .join(format!("{}.toml", $file));
            ::blox_tests::utils::wrapper_proj(path);
        }
    };
}
