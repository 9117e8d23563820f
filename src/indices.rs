//! Int streams built from positions in a slice or characters of a string.

use crate::stream::NumStream;

impl<'a> NumStream<'a, i32> {
    /// The valid indices of `items`, ascending.
    ///
    /// # Panics
    /// Panics if `items` has more than `i32::MAX` elements.
    ///
    /// # Examples
    /// ```
    /// use u_numstream::NumStream;
    /// let idx = NumStream::of_indices(&["a", "b", "c"]).to_vec().unwrap();
    /// assert_eq!(idx, vec![0, 1, 2]);
    /// ```
    pub fn of_indices<E>(items: &'a [E]) -> Self {
        Self::range(0, index_bound(items.len()))
    }

    /// The indices of `items` whose element matches `predicate`, ascending.
    ///
    /// The predicate is evaluated lazily, one index at a time, as the
    /// stream is pulled; no index list is built up front.
    ///
    /// # Panics
    /// Panics if `items` has more than `i32::MAX` elements.
    ///
    /// # Examples
    /// ```
    /// use u_numstream::NumStream;
    /// let positive = NumStream::of_indices_by(&[5, -100, 1], |&x| x > 0).to_vec().unwrap();
    /// assert_eq!(positive, vec![0, 2]);
    /// ```
    pub fn of_indices_by<E, P>(items: &'a [E], mut predicate: P) -> Self
    where
        E: Sync,
        P: FnMut(&E) -> bool + Send + 'a,
    {
        let end = index_bound(items.len());
        Self::of((0..end).filter(move |&i| predicate(&items[i as usize])))
    }

    /// The Unicode scalar values of `text`, in order.
    ///
    /// Characters outside the Basic Multilingual Plane yield one element,
    /// not a UTF-16 surrogate pair: `"😀"` gives `[0x1F600]`. Use
    /// `NumStream::of(text.encode_utf16().map(i32::from))` for code units.
    pub fn of_chars(text: &'a str) -> Self {
        Self::of(text.chars().map(|c| u32::from(c) as i32))
    }
}

fn index_bound(len: usize) -> i32 {
    assert!(
        len <= i32::MAX as usize,
        "slice of {len} elements has indices beyond i32::MAX"
    );
    len as i32
}

#[cfg(test)]
mod tests {
    use crate::NumStream;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_of_indices_numeric_slices() {
        assert_eq!(NumStream::of_indices::<i32>(&[]).to_vec().unwrap(), Vec::<i32>::new());
        assert_eq!(NumStream::of_indices(&[5, -100, 1]).to_vec().unwrap(), vec![0, 1, 2]);
        assert_eq!(NumStream::of_indices(&[5_i64, -100, 1]).to_vec().unwrap(), vec![0, 1, 2]);
        assert_eq!(
            NumStream::of_indices_by(&[5.0, -100.0, 1.0], |&x| x > 0.0).to_vec().unwrap(),
            vec![0, 2]
        );
        assert_eq!(
            NumStream::of_indices_by(&[5_i64, -100, 1], |&x| x > 0).to_vec().unwrap(),
            vec![0, 2]
        );
    }

    #[test]
    fn test_of_indices_strings() {
        let words = ["a", "", "c"];
        assert_eq!(NumStream::of_indices(&words).to_vec().unwrap(), vec![0, 1, 2]);
        assert_eq!(
            NumStream::of_indices_by(&words, |s| s.is_empty()).to_vec().unwrap(),
            vec![1]
        );
    }

    #[test]
    fn test_of_indices_by_is_lazy() {
        let calls = AtomicUsize::new(0);
        let data = [-1, 2, 3, 4, 5];
        let first = NumStream::of_indices_by(&data, |&x| {
            calls.fetch_add(1, Ordering::Relaxed);
            x > 0
        })
        .first()
        .unwrap();
        assert_eq!(first, Some(1));
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_of_chars() {
        assert_eq!(NumStream::of_chars("abc").to_vec().unwrap(), vec![97, 98, 99]);
        assert_eq!(NumStream::of_chars("é").to_vec().unwrap(), vec![0xE9]);
        assert_eq!(NumStream::of_chars("").count().unwrap(), 0);
    }

    #[test]
    fn test_of_chars_yields_scalar_values_not_code_units() {
        assert_eq!(NumStream::of_chars("😀").to_vec().unwrap(), vec![0x1F600]);
        let units: Vec<i32> = "😀".encode_utf16().map(i32::from).collect();
        assert_eq!(NumStream::of(units).to_vec().unwrap(), vec![0xD83D, 0xDE00]);
    }
}
