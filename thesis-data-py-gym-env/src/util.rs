//! Conversions between Python objects and Rust values.
use ndarray::{ArrayD, Axis};
use numpy::{PyArray1, PyArrayDyn, PyReadonlyArrayDyn};
use pyo3::{
    exceptions::PyValueError,
    prelude::*,
    types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyString, PyTuple},
};
use serde_yaml::{Mapping, Value};
use thesis_data_core::{
    record::{Record, RecordValue},
    Bound as SpaceBound, GymAct, Space,
};

/// Converts an array-like object into an `f32` array.
pub fn pyobj_to_arrayd(obj: &Bound<'_, PyAny>) -> PyResult<ArrayD<f32>> {
    let py = obj.py();
    let kwargs = PyDict::new(py);
    kwargs.set_item("dtype", "float32")?;
    let array = py
        .import("numpy")?
        .call_method("asarray", (obj,), Some(&kwargs))?;
    let array: PyReadonlyArrayDyn<f32> = array.extract()?;
    Ok(array.as_array().to_owned())
}

/// Converts an action into a Python object.
///
/// For vectorized environments the action is given a batch dimension of 1.
pub fn act_to_pyobj<'py>(py: Python<'py>, act: &GymAct, batch: bool) -> PyResult<Bound<'py, PyAny>> {
    match (act, batch) {
        (GymAct::Discrete(a), false) => Ok(a.into_pyobject(py)?.into_any()),
        (GymAct::Discrete(a), true) => Ok(PyArray1::from_vec(py, vec![*a]).into_any()),
        (GymAct::Continuous(a), false) => Ok(PyArrayDyn::from_array(py, a).into_any()),
        (GymAct::Continuous(a), true) => {
            Ok(PyArrayDyn::from_array(py, &a.clone().insert_axis(Axis(0))).into_any())
        }
    }
}

/// Converts an object into YAML.
///
/// Objects without a YAML counterpart are written as their `repr`.
pub fn pyobj_to_yaml(obj: &Bound<'_, PyAny>) -> PyResult<Value> {
    if obj.is_none() {
        Ok(Value::Null)
    } else if obj.is_instance_of::<PyBool>() {
        Ok(Value::Bool(obj.extract()?))
    } else if obj.is_instance_of::<PyInt>() {
        match obj.extract::<i64>() {
            Ok(v) => Ok(Value::from(v)),
            Err(_) => Ok(Value::String(obj.str()?.to_string())),
        }
    } else if obj.is_instance_of::<PyFloat>() {
        Ok(Value::from(obj.extract::<f64>()?))
    } else if obj.is_instance_of::<PyString>() {
        Ok(Value::String(obj.extract()?))
    } else if let Ok(dict) = obj.downcast::<PyDict>() {
        let mut mapping = Mapping::new();
        for (k, v) in dict.iter() {
            mapping.insert(Value::String(k.str()?.to_string()), pyobj_to_yaml(&v)?);
        }
        Ok(Value::Mapping(mapping))
    } else if obj.is_instance_of::<PyList>() || obj.is_instance_of::<PyTuple>() {
        let items = obj
            .try_iter()?
            .map(|item| pyobj_to_yaml(&item?))
            .collect::<PyResult<Vec<_>>>()?;
        Ok(Value::Sequence(items))
    } else if obj.hasattr("dtype")? && obj.hasattr("tolist")? {
        // numpy arrays and scalars
        pyobj_to_yaml(&obj.call_method0("tolist")?)
    } else {
        Ok(Value::String(obj.repr()?.to_string()))
    }
}

/// Converts a JSON object into a Python dict.
pub fn json_to_pydict<'py>(py: Python<'py>, value: &serde_json::Value) -> PyResult<Bound<'py, PyDict>> {
    if value.is_null() {
        return Ok(PyDict::new(py));
    }
    if !value.is_object() {
        return Err(PyValueError::new_err(format!(
            "Expected a JSON object, got {}",
            value
        )));
    }
    let dict = py
        .import("json")?
        .call_method1("loads", (value.to_string(),))?
        .downcast_into::<PyDict>()?;
    Ok(dict)
}

/// Converts the info dict of a step into a record.
///
/// Booleans, numbers, strings, arrays and nested dicts are kept, other
/// values are dropped.
pub fn pydict_to_record(obj: &Bound<'_, PyAny>) -> PyResult<Record> {
    let mut record = Record::empty();
    let dict = match obj.downcast::<PyDict>() {
        Ok(dict) => dict,
        Err(_) => return Ok(record),
    };

    for (k, v) in dict.iter() {
        let key = k.str()?.to_string();
        let value = if v.is_instance_of::<PyBool>() {
            RecordValue::Bool(v.extract()?)
        } else if v.is_instance_of::<PyInt>() {
            match v.extract::<i64>() {
                Ok(v) => RecordValue::Integer(v),
                Err(_) => continue,
            }
        } else if v.is_instance_of::<PyFloat>() {
            RecordValue::Scalar(v.extract::<f64>()? as f32)
        } else if v.is_instance_of::<PyString>() {
            RecordValue::String(v.extract()?)
        } else if v.is_instance_of::<PyDict>() {
            RecordValue::Nested(pydict_to_record(&v)?)
        } else if v.hasattr("dtype")? {
            match pyobj_to_arrayd(&v) {
                Ok(a) if a.ndim() == 0 => RecordValue::Scalar(a.iter().copied().next().unwrap_or(0.0)),
                Ok(a) => RecordValue::ArrayD(a.iter().copied().collect(), a.shape().to_vec()),
                Err(_) => continue,
            }
        } else {
            continue;
        };
        record.insert(key, value);
    }
    Ok(record)
}

/// Fully qualified class name of an object, e.g., `gym.wrappers.time_limit.TimeLimit`.
pub fn qualified_name(obj: &Bound<'_, PyAny>) -> PyResult<String> {
    let ty = obj.get_type();
    let module = ty.module()?.to_string();
    let name = ty.qualname()?.to_string();
    Ok(if module == "builtins" {
        name
    } else {
        format!("{}.{}", module, name)
    })
}

/// Converts a gym space.
///
/// Spaces other than `Discrete` and `Box` are kept as their `repr`.
pub fn space_from_py(space: &Bound<'_, PyAny>) -> PyResult<Space> {
    let name = space.get_type().name()?.to_string();
    match name.as_str() {
        "Discrete" => {
            let n = space.getattr("n")?.extract::<i64>()?;
            let start = match space.getattr("start") {
                Ok(start) => start.extract::<i64>()?,
                Err(_) => 0,
            };
            Ok(Space::Discrete { n, start })
        }
        "Box" => {
            let bound = |attr: &str| -> PyResult<SpaceBound> {
                let vs = pyobj_to_arrayd(&space.getattr(attr)?)?
                    .iter()
                    .map(|v| *v as f64)
                    .collect();
                Ok(SpaceBound::Array(vs).collapse())
            };
            Ok(Space::Box {
                shape: space.getattr("shape")?.extract()?,
                low: bound("low")?,
                high: bound("high")?,
                dtype: space.getattr("dtype")?.str()?.to_string(),
            })
        }
        _ => Ok(Space::Other {
            repr: space.repr()?.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyo3::ffi::c_str;

    // Needs a Python interpreter with numpy.
    #[test]
    #[ignore]
    fn test_pyobj_to_yaml() -> PyResult<()> {
        Python::with_gil(|py| {
            let obj = py.eval(
                c_str!("{'a': 1, 'b': [True, 0.5, None], 'c': (1, 'x')}"),
                None,
                None,
            )?;
            let yaml = pyobj_to_yaml(&obj)?;
            let expected: Value = serde_yaml::from_str("{a: 1, b: [true, 0.5, null], c: [1, x]}")
                .map_err(|e| PyValueError::new_err(e.to_string()))?;
            assert_eq!(yaml, expected);
            Ok(())
        })
    }

    #[test]
    #[ignore]
    fn test_json_to_pydict() -> PyResult<()> {
        Python::with_gil(|py| {
            let dict = json_to_pydict(py, &serde_json::json!({"num_actions": 4}))?;
            let n: i64 = dict
                .get_item("num_actions")?
                .ok_or_else(|| PyValueError::new_err("missing"))?
                .extract()?;
            assert_eq!(n, 4);
            assert!(json_to_pydict(py, &serde_json::json!([1])).is_err());
            Ok(())
        })
    }
}
