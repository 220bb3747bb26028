use crate::types::{AttributeType, ObjectType};

impl ObjectType {
    /// `merge_attrs`: key set is the union of both sides. Shared keys unify
    /// their types and OR their nullability; a key missing on one side counts
    /// as a null observation there.
    pub(crate) fn join(mut a: Self, b: Self) -> Self {
        // merge keys from a
        for (k, attr) in a.attributes.iter_mut() {
            if !b.attributes.contains_key(k) {
                attr.nullable = true;
            }
        }
        // add or merge keys from b
        for (k, fb) in b.attributes {
            let merged = match a.attributes.remove(&k) {
                Some(fa) => AttributeType {
                    ty: super::unify(fa.ty, fb.ty),
                    nullable: fa.nullable || fb.nullable,
                },
                None => AttributeType { ty: fb.ty, nullable: true },
            };
            a.attributes.insert(k, merged);
        }
        a
    }
}
