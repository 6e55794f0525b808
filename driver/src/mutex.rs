use core::{
    cell::{BorrowMutError, RefCell},
    fmt,
    ops::DerefMut,
};

/// Shared access to a [`Bus`](crate::bus::Bus) from several actuator handles.
#[expect(async_fn_in_trait, reason = "bus futures are driven on one executor")]
pub trait Mutex {
    type Item;
    type Error: fmt::Debug + fmt::Display;
    fn new(item: Self::Item) -> Self;
    async fn lock(&self) -> Result<impl DerefMut<Target = Self::Item>, Self::Error>;
}

/// Single-task sharing; a second concurrent `lock` is an error, not a wait.
impl<T> Mutex for RefCell<T> {
    type Item = T;
    type Error = BorrowMutError;

    #[inline(always)]
    fn new(item: T) -> Self {
        RefCell::new(item)
    }

    #[inline(always)]
    async fn lock(&self) -> Result<impl DerefMut<Target = T>, Self::Error> {
        self.try_borrow_mut()
    }
}
