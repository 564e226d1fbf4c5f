use std::path::PathBuf;

use permuta_lop::LopInstance;

use crate::util::{self, Output};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InfoArg {
    /// LOP instance file
    instance: PathBuf,
}

pub(crate) fn run(arg: &InfoArg) -> anyhow::Result<()> {
    let InfoArg { instance: path } = arg;
    let instance = util::read_instance_file(path)?;
    let mut output = Output::stdout();
    for line in describe(&util::instance_id(path), &instance) {
        output.write_line(&line)?;
    }
    output.finish()
}

fn describe(id: &str, instance: &LopInstance) -> Vec<String> {
    let bounds = instance.bounds();
    let optimum = instance
        .known_optimum()
        .map_or_else(|| "unknown".to_owned(), |value| value.to_string());
    vec![
        format!("Instance:      {id}"),
        format!("Size:          {}", instance.size()),
        format!("Lower bound:   {}", bounds.lower),
        format!("Upper bound:   {}", bounds.upper),
        format!("Known optimum: {optimum}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_instance() {
        let instance = "3\n0 4 1\n0 0 2\n3 0 0\n7\n".parse::<LopInstance>().unwrap();
        let lines = describe("tiny", &instance);
        assert_eq!(lines[0], "Instance:      tiny");
        assert_eq!(lines[1], "Size:          3");
        // pairs (0,1): 0/4, (0,2): 1/3, (1,2): 0/2
        assert_eq!(lines[2], "Lower bound:   1");
        assert_eq!(lines[3], "Upper bound:   9");
        assert_eq!(lines[4], "Known optimum: 7");

        let instance = "2 0 1 0 0".parse::<LopInstance>().unwrap();
        assert_eq!(describe("pair", &instance)[4], "Known optimum: unknown");
    }
}
