//! Model YAML and parameter CSV rendering

use serde_yaml::{Mapping, Value};

use super::model::SimulationConfig;
use crate::error::{AssistantError, Result};

const CSV_HEADER: &str = "label,value,expression,minimum,maximum,non-negative,vary,standard-error";

fn species_label(i: usize) -> String {
    format!("species_{}", i + 1)
}

fn map<const N: usize>(entries: [(&str, Value); N]) -> Value {
    let mut mapping = Mapping::new();
    for (key, value) in entries {
        mapping.insert(Value::from(key), value);
    }
    Value::Mapping(mapping)
}

fn list(items: impl IntoIterator<Item = String>) -> Value {
    Value::Sequence(items.into_iter().map(Value::from).collect())
}

/// Transfer matrix entries `(to, from) -> rate parameter`
fn k_matrix(config: &SimulationConfig) -> Mapping {
    let n = config.species();
    let mut matrix = Mapping::new();
    for i in 0..n {
        let from = species_label(i);
        let to = if config.settings.use_sequential_scheme && i + 1 < n {
            species_label(i + 1)
        } else {
            from.clone()
        };
        matrix.insert(
            Value::from(format!("({}, {})", to, from)),
            Value::from(format!("rates.{}", from)),
        );
    }
    matrix
}

/// Render the model definition
pub fn model_yaml(config: &SimulationConfig) -> Result<String> {
    let n = config.species();
    let species: Vec<String> = (0..n).map(species_label).collect();
    let sequential = config.settings.use_sequential_scheme;

    let inputs = (0..n).map(|i| {
        if !sequential || i == 0 { "input.1".to_string() } else { "input.0".to_string() }
    });

    let mut shape_refs = Mapping::new();
    let mut shapes = Mapping::new();
    for (i, label) in species.iter().enumerate() {
        let shape = format!("shape_{}", i + 1);
        shape_refs.insert(Value::from(label.as_str()), Value::from(shape.as_str()));
        shapes.insert(
            Value::from(shape),
            map([
                ("type", Value::from("skewed-gaussian")),
                ("amplitude", Value::from(format!("shapes.{}.amplitude", label))),
                ("location", Value::from(format!("shapes.{}.location", label))),
                ("width", Value::from(format!("shapes.{}.width", label))),
                ("skewness", Value::from(format!("shapes.{}.skewness", label))),
            ]),
        );
    }

    let mut dataset = Mapping::new();
    dataset.insert("initial_concentration".into(), "input".into());
    dataset.insert("megacomplex".into(), list(["mc1".to_string()]));
    dataset.insert("global_megacomplex".into(), list(["mc2".to_string()]));
    if config.settings.add_gaussian_irf {
        dataset.insert("irf".into(), "gaussian_irf".into());
    }

    let mut root = Mapping::new();
    root.insert("default_megacomplex".into(), "decay".into());
    root.insert(
        "initial_concentration".into(),
        map([(
            "input",
            map([("compartments", list(species.clone())), ("parameters", list(inputs))]),
        )]),
    );
    root.insert(
        "k_matrix".into(),
        map([("k1", map([("matrix", Value::Mapping(k_matrix(config)))]))]),
    );
    root.insert(
        "megacomplex".into(),
        map([
            ("mc1", map([("k_matrix", list(["k1".to_string()]))])),
            (
                "mc2",
                map([("type", Value::from("spectral")), ("shape", Value::Mapping(shape_refs))]),
            ),
        ]),
    );
    root.insert("shape".into(), Value::Mapping(shapes));
    if config.settings.add_gaussian_irf {
        root.insert(
            "irf".into(),
            map([(
                "gaussian_irf",
                map([
                    ("type", Value::from("gaussian")),
                    ("center", Value::from("irf.center")),
                    ("width", Value::from("irf.width")),
                ]),
            )]),
        );
    }
    root.insert("dataset".into(), map([("dataset_1", Value::Mapping(dataset))]));

    serde_yaml::to_string(&Value::Mapping(root))
        .map_err(|e| AssistantError::Generation(format!("Model serialization failed: {}", e)))
}

fn parameter_row(label: &str, value: f64, non_negative: bool, vary: bool) -> String {
    let title = |b: bool| if b { "True" } else { "False" };
    format!(
        "{},{},,-inf,inf,{},{},",
        label,
        value,
        title(non_negative),
        title(vary)
    )
}

/// Render the starting parameters
pub fn parameters_csv(config: &SimulationConfig) -> String {
    let mut lines = vec![CSV_HEADER.to_string()];

    for (i, rate) in config.kinetic_parameters.decay_rates.iter().enumerate() {
        lines.push(parameter_row(&format!("rates.{}", species_label(i)), *rate, true, true));
    }

    lines.push(parameter_row("input.1", 1.0, false, false));
    if config.settings.use_sequential_scheme {
        lines.push(parameter_row("input.0", 0.0, false, false));
    }

    let p = &config.spectral_parameters;
    for i in 0..config.species() {
        let label = species_label(i);
        for (field, value) in [
            ("amplitude", p.amplitude[i]),
            ("location", p.location[i]),
            ("width", p.width[i]),
            ("skewness", p.skewness[i]),
        ] {
            lines.push(parameter_row(&format!("shapes.{}.{}", label, field), value, false, true));
        }
    }

    if config.settings.add_gaussian_irf {
        lines.push(parameter_row("irf.center", config.irf.center, false, true));
        lines.push(parameter_row("irf.width", config.irf.width, false, true));
    }

    let mut csv = lines.join("\n");
    csv.push('\n');
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::model::fixtures::two_species;

    #[test]
    fn test_parallel_model_decays_each_species() {
        let yaml = model_yaml(&two_species(false)).unwrap();
        let value: Value = serde_yaml::from_str(&yaml).unwrap();

        let matrix = &value["k_matrix"]["k1"]["matrix"];
        assert_eq!(matrix["(species_1, species_1)"], Value::from("rates.species_1"));
        assert_eq!(matrix["(species_2, species_2)"], Value::from("rates.species_2"));
        assert_eq!(value["dataset"]["dataset_1"]["irf"], Value::from("gaussian_irf"));
        assert_eq!(value["shape"]["shape_2"]["type"], Value::from("skewed-gaussian"));
    }

    #[test]
    fn test_sequential_model_chains_species() {
        let mut config = two_species(true);
        config.settings.add_gaussian_irf = false;
        let value: Value = serde_yaml::from_str(&model_yaml(&config).unwrap()).unwrap();

        let matrix = &value["k_matrix"]["k1"]["matrix"];
        assert_eq!(matrix["(species_2, species_1)"], Value::from("rates.species_1"));
        assert_eq!(matrix["(species_2, species_2)"], Value::from("rates.species_2"));

        let inputs = &value["initial_concentration"]["input"]["parameters"];
        assert_eq!(inputs[0], Value::from("input.1"));
        assert_eq!(inputs[1], Value::from("input.0"));
        assert!(value.get("irf").is_none());
    }

    #[test]
    fn test_parameter_csv_rows() {
        let csv = parameters_csv(&two_species(false));
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines[1], "rates.species_1,0.5,,-inf,inf,True,True,");
        assert!(lines.contains(&"input.1,1,,-inf,inf,False,False,"));
        assert!(lines.contains(&"shapes.species_2.location,680,,-inf,inf,False,True,"));
        assert!(lines.contains(&"irf.width,0.1,,-inf,inf,False,True,"));
        assert!(!csv.contains("input.0"));
    }
}
