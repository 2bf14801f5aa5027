#![allow(non_snake_case)]

use pretty_assertions::assert_eq;
use qparams::{Config, DuplicateScalar, Error, QueryMap};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn query(url: &str) -> QueryMap {
    let url = url::Url::parse(url).expect("valid url");
    QueryMap::from(&url)
}

#[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
struct Data {
    B: bool,
    I: i64,
    F32: f32,
    F64: f64,
    S: String,
}

#[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
struct Arrays {
    B: Vec<bool>,
    I: Vec<i64>,
    F32: Vec<f32>,
    F64: Vec<f64>,
    S: Vec<String>,
}

#[test]
fn deserialize_scalars() {
    let cases = [
        ("http://example.org", Data::default()),
        (
            "http://example.org?b=true",
            Data {
                B: true,
                ..Default::default()
            },
        ),
        (
            "http://example.org?i=27",
            Data {
                I: 27,
                ..Default::default()
            },
        ),
        (
            "http://example.org?f32=2.7",
            Data {
                F32: 2.7,
                ..Default::default()
            },
        ),
        (
            "http://example.org?f64=2.7",
            Data {
                F64: 2.7,
                ..Default::default()
            },
        ),
        (
            "http://example.org?s=some%20string",
            Data {
                S: "some string".to_owned(),
                ..Default::default()
            },
        ),
    ];

    for (url, want) in cases {
        let mut got = Data::default();
        qparams::from_query_into(&query(url), &mut got)
            .unwrap_or_else(|err| panic!("{url}: {err}"));
        assert_eq!(got, want, "{url}");
    }
}

#[test]
fn deserialize_invalid_scalars() {
    let mut got = Data::default();

    let err = qparams::from_query_into(&query("http://example.org?b=not-a-bool"), &mut got)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidBool { field: "B", ref key, ref value } if key == "b" && value == "not-a-bool"
    ));

    let err = qparams::from_query_into(&query("http://example.org?i=true"), &mut got).unwrap_err();
    assert!(matches!(err, Error::InvalidInt { field: "I", .. }));

    let err = qparams::from_query_into(&query("http://example.org?f32=not-a-float"), &mut got)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidFloat { field: "F32", .. }));

    let err = qparams::from_query_into(&query("http://example.org?f64=not-a-float"), &mut got)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidFloat { field: "F64", .. }));

    assert_eq!(got, Data::default());
}

#[test]
fn deserialize_bool_is_case_sensitive() {
    let mut got = Data::default();
    for text in ["TRUE", "True", "1", "yes", ""] {
        let query: QueryMap = [("b", text)].into_iter().collect();
        let err = qparams::from_query_into(&query, &mut got).unwrap_err();
        assert!(matches!(err, Error::InvalidBool { .. }), "{text:?}");
    }
}

#[test]
fn deserialize_number_literals() {
    #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
    struct Numbers {
        small: u8,
        signed: i32,
        unsigned: u32,
        f: f64,
    }

    let got: Numbers = qparams::from_str("small=255&signed=%2B5&unsigned=7&f=-1.5e3").unwrap();
    assert_eq!(
        got,
        Numbers {
            small: 255,
            signed: 5,
            unsigned: 7,
            f: -1500.0,
        }
    );

    let got: Numbers = qparams::from_str("signed=-12").unwrap();
    assert_eq!(got.signed, -12);

    for input in ["small=256", "unsigned=-3", "signed=1.5", "signed=0x10", "small= 1"] {
        let err = qparams::from_str::<Numbers>(input).unwrap_err();
        assert!(matches!(err, Error::InvalidInt { .. }), "{input}: {err}");
    }

    for input in ["f=1,5", "f=", "f=one"] {
        let err = qparams::from_str::<Numbers>(input).unwrap_err();
        assert!(matches!(err, Error::InvalidFloat { .. }), "{input}: {err}");
    }
}

#[test]
fn deserialize_sequences() {
    let cases = [
        ("http://example.org", Arrays::default()),
        (
            "http://example.org?b=true&b=false",
            Arrays {
                B: vec![true, false],
                ..Default::default()
            },
        ),
        (
            "http://example.org?i=1&i=2",
            Arrays {
                I: vec![1, 2],
                ..Default::default()
            },
        ),
        (
            "http://example.org?f32=1.1&f32=2.1",
            Arrays {
                F32: vec![1.1, 2.1],
                ..Default::default()
            },
        ),
        (
            "http://example.org?f64=1.1&f64=2.1",
            Arrays {
                F64: vec![1.1, 2.1],
                ..Default::default()
            },
        ),
        (
            "http://example.org?s=first&s=second",
            Arrays {
                S: vec!["first".to_owned(), "second".to_owned()],
                ..Default::default()
            },
        ),
        (
            "http://example.org?s=first&i=1&s=second&i=2",
            Arrays {
                S: vec!["first".to_owned(), "second".to_owned()],
                I: vec![1, 2],
                ..Default::default()
            },
        ),
    ];

    for (url, want) in cases {
        let mut got = Arrays::default();
        qparams::from_query_into(&query(url), &mut got)
            .unwrap_or_else(|err| panic!("{url}: {err}"));
        assert_eq!(got, want, "{url}");
    }
}

#[test]
fn deserialize_invalid_sequence_element() {
    for url in [
        "http://example.org?b=true&b=not-a-bool",
        "http://example.org?i=1&i=not-an-int",
        "http://example.org?f32=1.1&f32=not-a-float",
        "http://example.org?f64=1.1&f64=not-a-float",
    ] {
        let mut got = Arrays::default();
        let err = qparams::from_query_into(&query(url), &mut got).unwrap_err();
        assert!(err.field().is_some(), "{url}: {err}");
        assert_eq!(got, Arrays::default(), "{url}");
    }
}

#[test]
fn deserialize_sequence_replaces_existing_values() {
    let mut got = Arrays {
        I: vec![9, 9, 9],
        S: vec!["kept".to_owned()],
        ..Default::default()
    };
    qparams::from_str_into("i=1&i=2", &mut got).unwrap();
    assert_eq!(got.I, [1, 2]);
    assert_eq!(got.S, ["kept"]);
}

#[test]
fn deserialize_keeps_untouched_fields() {
    let mut got = Data {
        B: false,
        I: -4,
        F32: 0.1,
        F64: 0.123_456_789_012_345_6,
        S: "before".to_owned(),
    };
    qparams::from_str_into("?b=true", &mut got).unwrap();
    assert_eq!(
        got,
        Data {
            B: true,
            I: -4,
            F32: 0.1,
            F64: 0.123_456_789_012_345_6,
            S: "before".to_owned(),
        }
    );
}

#[test]
fn deserialize_error_leaves_destination_untouched() {
    let before = Data {
        I: 3,
        S: "before".to_owned(),
        ..Default::default()
    };
    let mut got = Data {
        I: 3,
        S: "before".to_owned(),
        ..Default::default()
    };
    let err = qparams::from_str_into("s=after&b=true&i=oops", &mut got).unwrap_err();
    assert!(matches!(err, Error::InvalidInt { field: "I", .. }));
    assert_eq!(got, before);
}

#[test]
fn deserialize_ignores_unknown_and_differently_cased_keys() {
    let mut got = Data::default();
    qparams::from_str_into("unknown=1&B=true&I=5&s=x", &mut got).unwrap();
    assert_eq!(
        got,
        Data {
            S: "x".to_owned(),
            ..Default::default()
        }
    );
}

#[test]
fn deserialize_reports_first_error_in_query_order() {
    let mut got = Data::default();
    let err = qparams::from_str_into("f64=bad&b=bad", &mut got).unwrap_err();
    assert!(matches!(err, Error::InvalidFloat { field: "F64", .. }));

    let err = qparams::from_str_into("b=bad&f64=bad", &mut got).unwrap_err();
    assert!(matches!(err, Error::InvalidBool { field: "B", .. }));
}

#[test]
fn deserialize_duplicate_scalar_policies() {
    let q = QueryMap::parse("i=1&s=a&i=2&s=b").unwrap();

    let got: Data = qparams::from_query(&q).unwrap();
    assert_eq!((got.I, got.S.as_str()), (2, "b"));

    let got: Data = Config::new()
        .duplicate_scalar(DuplicateScalar::First)
        .deserialize_query(&q)
        .unwrap();
    assert_eq!((got.I, got.S.as_str()), (1, "a"));

    let err = Config::new()
        .duplicate_scalar(DuplicateScalar::Reject)
        .deserialize_query::<Data>(&q)
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateValue { field: "I", ref key } if key == "i"));

    // sequences always take every value
    let got: Arrays = Config::new()
        .duplicate_scalar(DuplicateScalar::Reject)
        .deserialize_query(&q)
        .unwrap();
    assert_eq!(got.I, [1, 2]);
}

#[test]
fn deserialize_renamed_and_newtype_fields() {
    #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
    struct Id(u64);

    #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
    struct Query {
        #[serde(rename = "UserID")]
        user: Id,
        ids: Vec<Id>,
    }

    let got: Query = qparams::from_str("userid=7&ids=1&ids=2").unwrap();
    assert_eq!(
        got,
        Query {
            user: Id(7),
            ids: vec![Id(1), Id(2)],
        }
    );

    let err = qparams::from_str::<Query>("userid=x").unwrap_err();
    assert!(matches!(err, Error::InvalidInt { field: "UserID", .. }));
}

#[test]
fn deserialize_into_non_record_fails() {
    let q = query("http://example.org?a=b&c=d");

    let mut i = 0i32;
    assert!(matches!(
        qparams::from_query_into(&q, &mut i),
        Err(Error::InvalidDestination(_))
    ));

    let mut v: Vec<String> = Vec::new();
    assert!(matches!(
        qparams::from_query_into(&q, &mut v),
        Err(Error::InvalidDestination(_))
    ));

    let mut m: HashMap<String, String> = HashMap::new();
    assert!(matches!(
        qparams::from_query_into(&q, &mut m),
        Err(Error::InvalidDestination(_))
    ));

    // independent of the query content
    let mut i = 0i32;
    assert!(matches!(
        qparams::from_query_into(&QueryMap::new(), &mut i),
        Err(Error::InvalidDestination(_))
    ));
}

#[test]
fn deserialize_mismatched_record_fails() {
    #[derive(Debug, Default, Deserialize, Serialize)]
    struct X {
        A: i32,
        C: bool,
    }

    let mut x = X::default();
    assert!(qparams::from_query_into(&query("http://example.org?a=b&c=d"), &mut x).is_err());
}

#[test]
fn deserialize_unsupported_field_fails_regardless_of_query() {
    #[derive(Debug, Default, Deserialize, Serialize)]
    struct Query {
        a: String,
        page: Option<u32>,
    }

    for input in ["", "a=x", "page=2"] {
        let mut got = Query::default();
        let err = qparams::from_str_into(input, &mut got).unwrap_err();
        assert!(
            matches!(
                err,
                Error::UnsupportedFieldType {
                    field: "page",
                    ty: "option"
                }
            ),
            "{input}: {err}"
        );
    }
}

#[test]
fn deserialize_empty_record() {
    #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
    struct Unit;

    #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
    struct Empty {}

    assert_eq!(qparams::from_str::<Unit>("a=1").unwrap(), Unit);
    assert_eq!(qparams::from_str::<Empty>("a=1").unwrap(), Empty {});
}

#[test]
fn error_messages_name_field_key_and_text() {
    let err = qparams::from_str::<Data>("b=maybe").unwrap_err();
    assert_eq!(
        err.to_string(),
        "field `B`: invalid bool \"maybe\" for key `b` (expected `true` or `false`)"
    );
}

#[test]
fn deserialize_fields_skipped_when_serializing() {
    #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
    struct Query {
        a: u32,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tags: Vec<String>,
        #[serde(skip_serializing)]
        hidden: String,
    }

    let got: Query = qparams::from_str("a=1").unwrap();
    assert_eq!(
        got,
        Query {
            a: 1,
            ..Default::default()
        }
    );

    let got: Query = qparams::from_str("tags=x&tags=y&hidden=h").unwrap();
    assert_eq!(
        got,
        Query {
            a: 0,
            tags: vec!["x".to_owned(), "y".to_owned()],
            hidden: "h".to_owned(),
        }
    );
}

#[test]
fn deserialize_float_overflow_fails() {
    #[derive(Debug, Default, PartialEq, Deserialize, Serialize)]
    struct Floats {
        f: f32,
        d: f64,
    }

    for input in ["f=1e40", "f=-1e40", "d=1e400"] {
        let err = qparams::from_str::<Floats>(input).unwrap_err();
        assert!(matches!(err, Error::InvalidFloat { .. }), "{input}: {err}");
    }

    let got: Floats = qparams::from_str("f=inf&d=-Infinity").unwrap();
    assert_eq!(got.f, f32::INFINITY);
    assert_eq!(got.d, f64::NEG_INFINITY);

    let got: Floats = qparams::from_str("f=NaN&d=3.4e38").unwrap();
    assert!(got.f.is_nan());
    assert_eq!(got.d, 3.4e38);
}
