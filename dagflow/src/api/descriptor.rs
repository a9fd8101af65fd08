//! Opaque `(class name, payload)` pairs naming pluggable behavior.
//!
//! The core never loads the named class. It stores and forwards the pair; plugin
//! registries resolve the name at runtime.

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct EntityDescriptor {
    pub(crate) class_name: String,
    pub(crate) user_payload: Option<Vec<u8>>,
}

impl EntityDescriptor {
    pub fn new(class_name: &str) -> Self {
        EntityDescriptor {
            class_name: class_name.to_string(),
            user_payload: None,
        }
    }

    pub fn with_payload(class_name: &str, payload: Vec<u8>) -> Self {
        EntityDescriptor {
            class_name: class_name.to_string(),
            user_payload: Some(payload),
        }
    }

    pub fn class_name(&self) -> &str {
        self.class_name.as_str()
    }

    pub fn user_payload(&self) -> Option<&[u8]> {
        self.user_payload.as_deref()
    }
}

descriptor!(
    /// Processor executed by every task of a vertex
    ProcessorDescriptor
);
descriptor!(InputDescriptor);
descriptor!(OutputDescriptor);
descriptor!(
    /// Runtime hook that decides a vertex's final parallelism and routing
    VertexManagerPluginDescriptor
);
descriptor!(
    /// Routing logic of a `Custom` edge
    EdgeManagerDescriptor
);
descriptor!(
    /// Initializer of a root input, run once before the vertex is scheduled
    InputInitializerDescriptor
);
descriptor!(OutputCommitterDescriptor);

#[cfg(test)]
mod tests {
    use crate::api::descriptor::{InputDescriptor, ProcessorDescriptor};

    #[test]
    pub fn descriptor_serde_test() {
        let p = ProcessorDescriptor::with_payload("word.Tokenizer", b"conf".to_vec());
        let json = serde_json::to_string(&p).unwrap();
        let p1: ProcessorDescriptor = serde_json::from_str(json.as_str()).unwrap();
        assert_eq!(p, p1);

        let i = InputDescriptor::new("hdfs.Input");
        assert!(i.user_payload().is_none());
        assert_ne!(
            InputDescriptor::new("x"),
            InputDescriptor::with_payload("x", vec![])
        );
    }
}
