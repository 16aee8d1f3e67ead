/// Runs a `.glyph` fixture through the built `glyph` binary and asserts on
/// its stdout (success case) or stderr (error case). Generalized from the
/// teacher's `.rocks`-fixture macro to this crate's file extension and
/// fixture layout (`tests/fixtures/<scope>/<name>.glyph`).
#[macro_export]
macro_rules! tests {
    ($file:ident in $scope:ident is OK $($expected:expr)*) => {
        #[test]
        fn $file() {
            use assert_cmd::Command;

            let mut expected = vec![$($expected),*];
            let expected = match expected.len() {
                0 => String::new(),
                _ => {
                    expected.push("");
                    expected.join("\n")
                }
            };

            let path = format!("tests/fixtures/{}/{}.glyph", stringify!($scope), stringify!($file));

            Command::cargo_bin("glyph")
                .unwrap()
                .arg(path)
                .assert()
                .stdout(expected)
                .success();
        }
    };

    ($file:ident in $scope:ident is ERR $($expected:expr)+) => {
        #[test]
        fn $file() {
            use assert_cmd::Command;

            let output = vec![$($expected),+].join("\n");
            let path = format!("tests/fixtures/{}/{}.glyph", stringify!($scope), stringify!($file));

            Command::cargo_bin("glyph")
                .unwrap()
                .arg(path)
                .assert()
                .stderr(format!("{output}\n"))
                .failure();
        }
    };
}
